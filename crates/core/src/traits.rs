use crate::error::DependencyError;
use crate::models::{
    DocumentMeta, DocumentRecord, IndexEntry, QuestionRecord, RetrievedChunk,
};
use async_trait::async_trait;

/// Similarity index over (text, vector, {document_id, page}) entries.
/// Searches are always scoped to one document; entries of other
/// documents must never come back.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert_entries(&self, entries: &[IndexEntry]) -> Result<(), DependencyError>;

    async fn search(
        &self,
        document_id: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, DependencyError>;

    async fn entry_count(&self, document_id: &str) -> Result<u64, DependencyError>;

    async fn delete_document(&self, document_id: &str) -> Result<(), DependencyError>;
}

/// Relational rows for documents and their question history, consumed
/// through simple key/filter operations only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), DependencyError>;

    async fn fetch_document(&self, id: &str) -> Result<Option<DocumentRecord>, DependencyError>;

    async fn list_documents(&self) -> Result<Vec<DocumentMeta>, DependencyError>;

    async fn mark_ready(&self, id: &str, content: &str) -> Result<(), DependencyError>;

    async fn mark_failed(&self, id: &str) -> Result<(), DependencyError>;

    async fn delete_document(&self, id: &str) -> Result<(), DependencyError>;

    async fn append_question(&self, record: &QuestionRecord) -> Result<(), DependencyError>;

    async fn question_history(
        &self,
        document_id: &str,
    ) -> Result<Vec<QuestionRecord>, DependencyError>;

    async fn delete_questions(&self, document_id: &str) -> Result<(), DependencyError>;
}

/// Raw PDF bytes keyed by document id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_document(
        &self,
        document_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DependencyError>;

    async fn delete_document(&self, document_id: &str) -> Result<(), DependencyError>;
}

/// Remote text-generation model, consumed as a black box: one prompt
/// in, one completion out.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DependencyError>;
}
