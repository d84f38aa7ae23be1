use crate::embeddings::Embedder;
use crate::models::DocumentMeta;
use crate::retriever::RetrieverHandle;
use crate::traits::VectorIndex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_RETRIEVER_CAPACITY: usize = 64;

type HandleKey = (String, usize);

struct RetrieverCacheInner {
    handles: HashMap<HandleKey, Arc<RetrieverHandle>>,
    order: VecDeque<HandleKey>,
}

/// Bounded LRU cache of retriever handles keyed by (document_id, k).
/// Owned by the query orchestrator and invalidated explicitly when a
/// document is deleted; least-recently-used handles fall out once the
/// capacity is reached.
pub struct RetrieverCache {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    capacity: usize,
    inner: Mutex<RetrieverCacheInner>,
    created: AtomicU64,
}

impl RetrieverCache {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, capacity: usize) -> Self {
        Self {
            embedder,
            index,
            capacity: capacity.max(1),
            inner: Mutex::new(RetrieverCacheInner {
                handles: HashMap::new(),
                order: VecDeque::new(),
            }),
            created: AtomicU64::new(0),
        }
    }

    /// Return the cached handle for (document_id, k), creating and
    /// caching one on first use.
    pub async fn handle(&self, document_id: &str, k: usize) -> Arc<RetrieverHandle> {
        let key = (document_id.to_string(), k);
        let mut inner = self.inner.lock().await;

        if let Some(handle) = inner.handles.get(&key).cloned() {
            inner.order.retain(|existing| existing != &key);
            inner.order.push_back(key);
            return handle;
        }

        let handle = Arc::new(RetrieverHandle::new(
            document_id,
            k,
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
        ));
        self.created.fetch_add(1, Ordering::Relaxed);
        inner.handles.insert(key.clone(), Arc::clone(&handle));
        inner.order.push_back(key);

        while inner.handles.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.handles.remove(&evicted);
                debug!(document_id = %evicted.0, k = evicted.1, "evicted retriever handle");
            }
        }

        handle
    }

    /// Drop every cached handle for the document, regardless of k.
    pub async fn invalidate(&self, document_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.handles.retain(|(id, _), _| id != document_id);
        inner.order.retain(|(id, _)| id != document_id);
    }

    /// Number of handles constructed so far; cache hits do not bump it.
    pub fn created_handles(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.handles.len()
    }
}

/// Bounded-staleness cache for the document list view, refreshed on
/// expiry and invalidated on upload or delete.
pub struct ListCache {
    ttl: Duration,
    inner: Mutex<Option<(Instant, Vec<DocumentMeta>)>>,
}

impl ListCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(None),
        }
    }

    pub async fn get(&self) -> Option<Vec<DocumentMeta>> {
        let inner = self.inner.lock().await;
        inner.as_ref().and_then(|(cached_at, documents)| {
            if cached_at.elapsed() < self.ttl {
                Some(documents.clone())
            } else {
                None
            }
        })
    }

    pub async fn put(&self, documents: Vec<DocumentMeta>) {
        *self.inner.lock().await = Some((Instant::now(), documents));
    }

    pub async fn invalidate(&self) {
        *self.inner.lock().await = None;
    }
}
