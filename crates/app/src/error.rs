use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdf_qa_core::error::{DependencyError, IngestError, QueryError};
use serde::Serialize;
use thiserror::Error;

/// Errors a handler can surface. Backend details are logged, never
/// echoed to the client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Internal server error")]
    Internal,
}

impl From<QueryError> for ApiError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::NotFound(id) => Self::NotFound(format!("document {id} not found")),
            QueryError::NotReady(message) => Self::Conflict(message),
            QueryError::EmptyQuestion => {
                Self::Validation("question must not be empty".to_string())
            }
            QueryError::DeadlineExceeded(_) => Self::DeadlineExceeded,
            QueryError::Dependency(inner) => Self::from(inner),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::PdfParse(message) | IngestError::InvalidDocument(message) => {
                Self::Validation(format!("not a usable pdf: {message}"))
            }
            IngestError::InvalidChunkConfig(message) => Self::Validation(message),
            other => {
                tracing::error!(error = %other, "ingestion failed internally");
                Self::Internal
            }
        }
    }
}

impl From<DependencyError> for ApiError {
    fn from(error: DependencyError) -> Self {
        tracing::error!(error = %error, "backend dependency failed");
        Self::Internal
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            status: "error".to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn query_errors_map_to_expected_statuses() {
        assert_eq!(
            status_of(QueryError::NotFound("x".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(QueryError::NotReady("pending".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(QueryError::EmptyQuestion.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(QueryError::DeadlineExceeded(Duration::from_secs(1)).into()),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn invalid_pdf_is_a_client_error() {
        let error: ApiError = IngestError::PdfParse("bad xref".into()).into();
        assert_eq!(status_of(error), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn backend_details_are_not_echoed() {
        let dependency = DependencyError::BackendResponse {
            service: "qdrant".to_string(),
            details: "secret internal detail".to_string(),
        };
        let error: ApiError = dependency.into();
        assert_eq!(error.to_string(), "Internal server error");
        assert_eq!(status_of(error), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
