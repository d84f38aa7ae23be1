use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ingestion state persisted alongside a document row. Readiness is
/// carried explicitly here rather than inferred from a non-empty
/// `content` field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    /// Concatenated chunk text, written once ingestion completes.
    #[serde(default)]
    pub content: Option<String>,
    pub status: DocumentStatus,
}

impl DocumentRecord {
    pub fn accepted(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            uploaded_at: Utc::now(),
            content: None,
            status: DocumentStatus::Pending,
        }
    }

    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            id: self.id.clone(),
            filename: self.filename.clone(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// List-view projection of a document row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMeta {
    pub id: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

/// One bounded unit of page text, the retrieval granularity. A chunk
/// belongs to exactly one page of exactly one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageChunk {
    pub document_id: String,
    pub page: u32,
    pub text: String,
}

/// A persisted (text, vector, metadata) triple in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub document_id: String,
    pub page: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

/// A chunk returned from similarity search, highest score first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub page: u32,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snippet {
    pub page: u32,
    pub text: String,
}

/// Shaped query response: the grounded answer, the sorted distinct
/// pages it drew on, and the top retrieved snippets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaAnswer {
    pub answer: String,
    pub source_pages: Vec<u32>,
    pub snippets: Vec<Snippet>,
}

/// Append-only question/answer audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub document_id: String,
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStatusReport {
    pub id: String,
    pub status: DocumentStatus,
    pub indexed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    FixedWindow,
    Semantic,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub strategy: ChunkStrategy,
    /// Fixed-window size in words.
    pub chunk_size: usize,
    /// Words shared between consecutive fixed windows.
    pub overlap: usize,
    /// Upper bound in words for a semantic chunk.
    pub max_chunk_size: usize,
    /// Chunks embedded and upserted per index-builder batch.
    pub batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::FixedWindow,
            chunk_size: 512,
            overlap: 50,
            max_chunk_size: 512,
            batch_size: 20,
        }
    }
}
