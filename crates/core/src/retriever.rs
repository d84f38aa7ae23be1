use crate::embeddings::Embedder;
use crate::error::DependencyError;
use crate::models::RetrievedChunk;
use crate::traits::VectorIndex;
use std::sync::Arc;

/// A reusable query object bound to one (document_id, k) pair. Cheap to
/// clone via Arc and safe to share across concurrent requests; caching
/// lives in [`crate::cache::RetrieverCache`].
pub struct RetrieverHandle {
    document_id: String,
    k: usize,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl RetrieverHandle {
    pub fn new(
        document_id: impl Into<String>,
        k: usize,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            k,
            embedder,
            index,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Embed the question and return the k most similar entries scoped
    /// to this handle's document. A document with no entries yields an
    /// empty result, not an error.
    pub async fn query(&self, question: &str) -> Result<Vec<RetrievedChunk>, DependencyError> {
        let vector = self.embedder.embed(question).await?;
        self.index.search(&self.document_id, &vector, self.k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashedEmbedder;
    use crate::models::IndexEntry;
    use crate::stores::memory::MemoryVectorIndex;

    async fn seed(index: &MemoryVectorIndex, document_id: &str, page: u32, text: &str) {
        let embedder = HashedEmbedder::default();
        index
            .upsert_entries(&[IndexEntry {
                id: format!("{document_id}-{page}"),
                document_id: document_id.to_string(),
                page,
                text: text.to_string(),
                vector: embedder.embed_sync(text),
            }])
            .await
            .expect("upsert");
    }

    #[tokio::test]
    async fn retrieval_is_scoped_to_the_handles_document() {
        let index = Arc::new(MemoryVectorIndex::default());
        seed(&index, "doc-a", 1, "whales sing in the deep ocean").await;
        seed(&index, "doc-b", 1, "whales sing in the deep ocean").await;
        seed(&index, "doc-b", 2, "whale songs travel for miles underwater").await;

        let handle = RetrieverHandle::new(
            "doc-a",
            10,
            Arc::new(HashedEmbedder::default()),
            index,
        );
        let hits = handle.query("whale songs in the ocean").await.expect("query");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page, 1);
    }

    #[tokio::test]
    async fn empty_index_yields_empty_result() {
        let handle = RetrieverHandle::new(
            "doc-none",
            5,
            Arc::new(HashedEmbedder::default()),
            Arc::new(MemoryVectorIndex::default()),
        );

        let hits = handle.query("anything at all").await.expect("query");
        assert!(hits.is_empty());
    }
}
