use crate::error::DependencyError;
use crate::models::{
    DocumentMeta, DocumentRecord, DocumentStatus, IndexEntry, QuestionRecord, RetrievedChunk,
};
use crate::traits::{BlobStore, DocumentStore, VectorIndex};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory vector index with cosine scoring. Backs development mode
/// and the test suites; nothing survives a restart.
#[derive(Default)]
pub struct MemoryVectorIndex {
    entries: Mutex<Vec<IndexEntry>>,
}

fn cosine(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let norm_left: f32 = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_right: f32 = right.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_left == 0.0 || norm_right == 0.0 {
        return 0.0;
    }
    f64::from(dot / (norm_left * norm_right))
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert_entries(&self, entries: &[IndexEntry]) -> Result<(), DependencyError> {
        self.entries.lock().await.extend_from_slice(entries);
        Ok(())
    }

    async fn search(
        &self,
        document_id: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, DependencyError> {
        let entries = self.entries.lock().await;
        let mut hits: Vec<RetrievedChunk> = entries
            .iter()
            .filter(|entry| entry.document_id == document_id)
            .map(|entry| RetrievedChunk {
                page: entry.page,
                text: entry.text.clone(),
                score: cosine(&entry.vector, vector),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn entry_count(&self, document_id: &str) -> Result<u64, DependencyError> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|entry| entry.document_id == document_id)
            .count() as u64)
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), DependencyError> {
        self.entries
            .lock()
            .await
            .retain(|entry| entry.document_id != document_id);
        Ok(())
    }
}

/// In-memory document and question rows.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, DocumentRecord>>,
    questions: Mutex<Vec<QuestionRecord>>,
}

impl MemoryDocumentStore {
    pub async fn document_count(&self) -> usize {
        self.documents.lock().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), DependencyError> {
        self.documents
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn fetch_document(&self, id: &str) -> Result<Option<DocumentRecord>, DependencyError> {
        Ok(self.documents.lock().await.get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentMeta>, DependencyError> {
        let documents = self.documents.lock().await;
        let mut listed: Vec<DocumentMeta> = documents.values().map(DocumentRecord::meta).collect();
        listed.sort_by(|left, right| right.uploaded_at.cmp(&left.uploaded_at));
        Ok(listed)
    }

    async fn mark_ready(&self, id: &str, content: &str) -> Result<(), DependencyError> {
        if let Some(record) = self.documents.lock().await.get_mut(id) {
            record.content = Some(content.to_string());
            record.status = DocumentStatus::Ready;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: &str) -> Result<(), DependencyError> {
        if let Some(record) = self.documents.lock().await.get_mut(id) {
            record.status = DocumentStatus::Failed;
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<(), DependencyError> {
        self.documents.lock().await.remove(id);
        Ok(())
    }

    async fn append_question(&self, record: &QuestionRecord) -> Result<(), DependencyError> {
        self.questions.lock().await.push(record.clone());
        Ok(())
    }

    async fn question_history(
        &self,
        document_id: &str,
    ) -> Result<Vec<QuestionRecord>, DependencyError> {
        let questions = self.questions.lock().await;
        let mut history: Vec<QuestionRecord> = questions
            .iter()
            .filter(|record| record.document_id == document_id)
            .cloned()
            .collect();
        history.sort_by_key(|record| record.asked_at);
        Ok(history)
    }

    async fn delete_questions(&self, document_id: &str) -> Result<(), DependencyError> {
        self.questions
            .lock()
            .await
            .retain(|record| record.document_id != document_id);
        Ok(())
    }
}

/// In-memory blob store keyed by document id.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryBlobStore {
    pub async fn contains(&self, document_id: &str) -> bool {
        self.objects.lock().await.contains_key(document_id)
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_document(
        &self,
        document_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DependencyError> {
        self.objects
            .lock()
            .await
            .insert(document_id.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), DependencyError> {
        self.objects.lock().await.remove(document_id);
        Ok(())
    }
}
