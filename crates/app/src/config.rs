use clap::{Parser, ValueEnum};
use pdf_qa_core::models::ChunkStrategy;
use std::time::Duration;

/// Backend wiring for rows, blobs, and vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendMode {
    /// In-process stores, nothing survives a restart. Development mode.
    Memory,
    /// PostgREST rows, bucket objects, and a Qdrant collection.
    Remote,
}

/// Which embedding vectors back the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingBackend {
    /// Deterministic local hashing, no network.
    Hashed,
    /// OpenAI-style `/embeddings` endpoint.
    Rest,
}

#[derive(Debug, Parser)]
#[command(name = "pdf-qa-server", version)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "PDF_QA_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    #[arg(long, env = "PDF_QA_BACKEND", value_enum, default_value = "memory")]
    pub backend: BackendMode,

    /// PostgREST base URL for document rows and question history.
    #[arg(long, env = "PDF_QA_POSTGREST_URL", default_value = "http://localhost:3000")]
    pub postgrest_url: String,

    /// Storage base URL for uploaded PDF blobs.
    #[arg(long, env = "PDF_QA_STORAGE_URL", default_value = "http://localhost:8001")]
    pub storage_url: String,

    /// Bucket name inside the blob store.
    #[arg(long, env = "PDF_QA_STORAGE_BUCKET", default_value = "pdfs")]
    pub storage_bucket: String,

    /// API key sent to PostgREST and the blob store.
    #[arg(long, env = "PDF_QA_BACKEND_API_KEY", default_value = "")]
    pub backend_api_key: String,

    #[arg(long, env = "PDF_QA_QDRANT_URL", default_value = "http://localhost:6333")]
    pub qdrant_url: String,

    #[arg(long, env = "PDF_QA_QDRANT_COLLECTION", default_value = "pdf_chunks")]
    pub qdrant_collection: String,

    #[arg(long, env = "PDF_QA_EMBEDDING_BACKEND", value_enum, default_value = "hashed")]
    pub embedding_backend: EmbeddingBackend,

    /// OpenAI-style API base URL for embeddings and completions.
    #[arg(long, env = "PDF_QA_MODEL_API_URL", default_value = "https://api.openai.com/v1")]
    pub model_api_url: String,

    #[arg(long, env = "PDF_QA_MODEL_API_KEY")]
    pub model_api_key: Option<String>,

    #[arg(long, env = "PDF_QA_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    #[arg(long, env = "PDF_QA_EMBEDDING_DIMENSIONS", default_value = "1536")]
    pub embedding_dimensions: usize,

    #[arg(long, env = "PDF_QA_COMPLETION_MODEL", default_value = "gpt-4o-mini")]
    pub completion_model: String,

    #[arg(long, env = "PDF_QA_CHUNK_STRATEGY", value_enum, default_value = "fixed-window")]
    pub chunk_strategy: ChunkStrategyArg,

    /// Chunk size in words.
    #[arg(long, env = "PDF_QA_CHUNK_SIZE", default_value = "512")]
    pub chunk_size: usize,

    /// Overlap between adjacent fixed windows, in words.
    #[arg(long, env = "PDF_QA_CHUNK_OVERLAP", default_value = "50")]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question.
    #[arg(long, env = "PDF_QA_TOP_K", default_value = "4")]
    pub top_k: usize,

    /// Upper bound in seconds on retrieval plus synthesis per question.
    #[arg(long, env = "PDF_QA_QUERY_DEADLINE_SECS", default_value = "60")]
    pub query_deadline_secs: u64,

    /// Retriever handles kept warm across questions.
    #[arg(long, env = "PDF_QA_RETRIEVER_CACHE_CAPACITY", default_value = "64")]
    pub retriever_cache_capacity: usize,

    /// Staleness bound in seconds for the document list view.
    #[arg(long, env = "PDF_QA_LIST_CACHE_TTL_SECS", default_value = "5")]
    pub list_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChunkStrategyArg {
    FixedWindow,
    Semantic,
}

impl From<ChunkStrategyArg> for ChunkStrategy {
    fn from(arg: ChunkStrategyArg) -> Self {
        match arg {
            ChunkStrategyArg::FixedWindow => ChunkStrategy::FixedWindow,
            ChunkStrategyArg::Semantic => ChunkStrategy::Semantic,
        }
    }
}

impl Config {
    pub fn query_deadline(&self) -> Duration {
        Duration::from_secs(self.query_deadline_secs.max(1))
    }

    pub fn list_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.list_cache_ttl_secs)
    }

    pub fn api_key(&self) -> Option<String> {
        if self.backend_api_key.is_empty() {
            None
        } else {
            Some(self.backend_api_key.clone())
        }
    }
}
