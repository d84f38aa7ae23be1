use std::time::Duration;
use thiserror::Error;

/// Failure talking to one of the external collaborators (vector store,
/// row store, object store, embedding or completion service).
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("invalid response from {service}: {details}")]
    BackendResponse { service: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document not ready: {0}")]
    NotReady(String),

    #[error("question is empty")]
    EmptyQuestion,

    #[error("query deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
