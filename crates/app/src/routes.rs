use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use pdf_qa_core::jobs::spawn_detached;
use pdf_qa_core::models::{DocumentStatus, QuestionRecord, Snippet};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/documents", post(upload_document).get(list_documents))
        .route("/documents/{id}", get(get_document).delete(delete_document))
        .route("/documents/{id}/status", get(document_status))
        .route("/questions", post(ask_question))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    document_id: String,
    filename: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct QaRequest {
    document_id: String,
    question: String,
}

#[derive(Debug, Serialize)]
struct QaResponse {
    answer: String,
    source_pages: Vec<u32>,
    context_snippets: Vec<Snippet>,
}

#[derive(Debug, Serialize)]
struct DocumentDetail {
    id: String,
    filename: String,
    uploaded_at: DateTime<Utc>,
    status: DocumentStatus,
    qa_history: Vec<QuestionRecord>,
}

/// Accept a multipart PDF upload. The synchronous part validates the
/// file and persists blob plus row; extraction and indexing continue
/// in a detached job after the response is sent.
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::Validation(format!("malformed multipart body: {error}")))?
    {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }
        let filename = field
            .file_name()
            .unwrap_or("upload.pdf")
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/pdf")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| ApiError::Validation(format!("failed to read upload: {error}")))?;
        upload = Some((filename, content_type, bytes.to_vec()));
        break;
    }

    let (filename, content_type, bytes) = upload
        .ok_or_else(|| ApiError::Validation("multipart body had no file field".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("uploaded file is empty".to_string()));
    }

    // Spool to disk so the extractor can reread the file after the
    // request body is gone.
    let spool_bytes = bytes.clone();
    let spooled = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(&spool_bytes)?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|error| {
        tracing::error!(error = %error, "spool task panicked");
        ApiError::Internal
    })?
    .map_err(|error| {
        tracing::error!(error = %error, "failed to spool upload to disk");
        ApiError::Internal
    })?;

    let record = state
        .pipeline
        .accept_upload(&filename, &content_type, spooled.path(), bytes)
        .await?;
    state.queries.invalidate(&record.id).await;

    let pipeline = Arc::clone(&state.pipeline);
    let document_id = record.id.clone();
    spawn_detached("document-ingestion", async move {
        // The tempfile must outlive the job, not the request.
        let spooled = spooled;
        pipeline.run_ingestion(&document_id, spooled.path()).await
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            document_id: record.id,
            filename: record.filename,
            message: "Upload and indexing scheduled".to_string(),
        }),
    ))
}

async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<QaRequest>,
) -> Result<Json<QaResponse>, ApiError> {
    let answer = state
        .queries
        .answer(&request.document_id, &request.question)
        .await?;
    Ok(Json(QaResponse {
        answer: answer.answer,
        source_pages: answer.source_pages,
        context_snippets: answer.snippets,
    }))
}

async fn list_documents(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let documents = state.queries.list_documents().await?;
    Ok(Json(documents))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, ApiError> {
    let (record, qa_history) = state.queries.document_with_history(&id).await?;
    Ok(Json(DocumentDetail {
        id: record.id,
        filename: record.filename,
        uploaded_at: record.uploaded_at,
        status: record.status,
        qa_history,
    }))
}

async fn document_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.queries.status(&id).await?;
    Ok(Json(report))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existed = state.pipeline.delete_document(&id).await?;
    state.queries.invalidate(&id).await;
    info!(document_id = %id, existed, "delete handled");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::build_state;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use clap::Parser;
    use http_body_util::BodyExt;
    use pdf_qa_core::embeddings::HashedEmbedder;
    use pdf_qa_core::error::DependencyError;
    use pdf_qa_core::extractor::LopdfExtractor;
    use pdf_qa_core::models::DocumentRecord;
    use pdf_qa_core::stores::memory::{
        MemoryBlobStore, MemoryDocumentStore, MemoryVectorIndex,
    };
    use pdf_qa_core::traits::{CompletionModel, DocumentStore};
    use tower::util::ServiceExt;

    struct CannedCompletion;

    #[async_trait]
    impl CompletionModel for CannedCompletion {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, DependencyError> {
            Ok("canned answer".to_string())
        }
    }

    struct TestApp {
        router: Router,
        documents: Arc<MemoryDocumentStore>,
    }

    fn test_app() -> TestApp {
        let config = Config::parse_from(["pdf-qa-server"]);
        let documents = Arc::new(MemoryDocumentStore::default());
        let state = build_state(
            &config,
            Arc::clone(&documents) as Arc<dyn DocumentStore>,
            Arc::new(MemoryBlobStore::default()),
            Arc::new(MemoryVectorIndex::default()),
            Arc::new(LopdfExtractor::default()),
            Arc::new(HashedEmbedder::default()),
            Arc::new(CannedCompletion),
        );
        TestApp {
            router: router(state),
            documents,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn question_for_unknown_document_is_404() {
        let app = test_app();
        let request = Request::post("/questions")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"document_id":"missing","question":"anything?"}"#,
            ))
            .expect("request");

        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn question_while_pending_is_409() {
        let app = test_app();
        app.documents
            .insert_document(&DocumentRecord::accepted("doc-1", "file.pdf"))
            .await
            .expect("insert");

        let request = Request::post("/questions")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"document_id":"doc-1","question":"ready yet?"}"#,
            ))
            .expect("request");

        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn ready_document_answers_with_shaped_response() {
        let app = test_app();
        app.documents
            .insert_document(&DocumentRecord::accepted("doc-1", "file.pdf"))
            .await
            .expect("insert");
        app.documents
            .mark_ready("doc-1", "document content")
            .await
            .expect("ready");

        let request = Request::post("/questions")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"document_id":"doc-1","question":"what is in here?"}"#,
            ))
            .expect("request");

        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["answer"], "canned answer");
        assert!(body["source_pages"].is_array());
        assert!(body["context_snippets"].is_array());
    }

    #[tokio::test]
    async fn empty_question_is_400() {
        let app = test_app();
        let request = Request::post("/questions")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"document_id":"doc-1","question":"  "}"#))
            .expect("request");

        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listing_starts_empty() {
        let app = test_app();
        let request = Request::get("/documents")
            .body(Body::empty())
            .expect("request");

        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn delete_of_unknown_document_is_idempotent() {
        let app = test_app();
        let request = Request::delete("/documents/never-existed")
            .body(Body::empty())
            .expect("request");

        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn status_of_unknown_document_is_404() {
        let app = test_app();
        let request = Request::get("/documents/missing/status")
            .body(Body::empty())
            .expect("request");

        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_400() {
        let app = test_app();
        let request = Request::post("/documents")
            .header(
                "content-type",
                "multipart/form-data; boundary=test-boundary",
            )
            .body(Body::from("--test-boundary--\r\n"))
            .expect("request");

        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
