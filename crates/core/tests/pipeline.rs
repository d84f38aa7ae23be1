//! End-to-end pipeline tests over the in-memory backends: upload a
//! real generated PDF, let ingestion run, then ask questions through
//! the query orchestrator.

use async_trait::async_trait;
use pdf_qa_core::cache::{RetrieverCache, DEFAULT_RETRIEVER_CAPACITY};
use pdf_qa_core::embeddings::{Embedder, HashedEmbedder};
use pdf_qa_core::error::{DependencyError, QueryError};
use pdf_qa_core::extractor::{write_test_pdf, LopdfExtractor};
use pdf_qa_core::ingest::IngestionPipeline;
use pdf_qa_core::models::{DocumentStatus, IngestionOptions};
use pdf_qa_core::query::{QueryOrchestrator, DEFAULT_LIST_CACHE_TTL, DEFAULT_QUERY_DEADLINE};
use pdf_qa_core::stores::memory::{MemoryBlobStore, MemoryDocumentStore, MemoryVectorIndex};
use pdf_qa_core::synthesizer::AnswerSynthesizer;
use pdf_qa_core::traits::{
    BlobStore, CompletionModel, DocumentStore, VectorIndex,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

struct EchoCompletion;

#[async_trait]
impl CompletionModel for EchoCompletion {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, DependencyError> {
        Ok(format!("based on: {user}"))
    }
}

struct Service {
    pipeline: IngestionPipeline,
    queries: QueryOrchestrator,
    documents: Arc<MemoryDocumentStore>,
    index: Arc<MemoryVectorIndex>,
}

fn service() -> Service {
    service_with_top_k(4)
}

fn service_with_top_k(top_k: usize) -> Service {
    let documents = Arc::new(MemoryDocumentStore::default());
    let blobs = Arc::new(MemoryBlobStore::default());
    let index = Arc::new(MemoryVectorIndex::default());
    let embedder = Arc::new(HashedEmbedder::default());

    let pipeline = IngestionPipeline::new(
        Arc::clone(&documents) as Arc<dyn DocumentStore>,
        Arc::clone(&blobs) as Arc<dyn BlobStore>,
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        Arc::new(LopdfExtractor::default()),
        Arc::clone(&embedder) as Arc<dyn Embedder>,
        IngestionOptions::default(),
    );
    let queries = QueryOrchestrator::new(
        Arc::clone(&documents) as Arc<dyn DocumentStore>,
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        RetrieverCache::new(
            embedder,
            Arc::clone(&index) as Arc<dyn VectorIndex>,
            DEFAULT_RETRIEVER_CAPACITY,
        ),
        AnswerSynthesizer::new(Arc::new(EchoCompletion)),
        top_k,
        DEFAULT_QUERY_DEADLINE,
        DEFAULT_LIST_CACHE_TTL,
    );

    Service {
        pipeline,
        queries,
        documents,
        index,
    }
}

async fn ingest(service: &Service, page_texts: &[&str]) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("upload.pdf");
    write_test_pdf(&path, page_texts);
    let bytes = std::fs::read(&path).expect("read pdf");

    let record = service
        .pipeline
        .accept_upload("upload.pdf", "application/pdf", &path, bytes)
        .await
        .expect("upload accepted");
    service
        .pipeline
        .run_ingestion(&record.id, &path)
        .await
        .expect("ingestion succeeds");
    record.id
}

const THREE_PAGES: [&str; 3] = [
    "introduction and general remarks about nothing in particular",
    "the warranty period lasts twenty four months from delivery",
    "appendix with shipping addresses and contact details",
];

#[tokio::test]
async fn answers_cite_only_the_page_that_matches_the_question() {
    // k below the chunk count, so a wrong ranking surfaces as a wrong
    // page citation instead of being hidden by retrieve-everything.
    let service = service_with_top_k(1);
    let id = ingest(&service, &THREE_PAGES).await;

    let answer = service
        .queries
        .answer(&id, "how long does the warranty period last?")
        .await
        .expect("answer");

    assert_eq!(answer.source_pages, vec![2]);
    assert_eq!(answer.snippets.len(), 1);
    assert_eq!(answer.snippets[0].page, 2);
    // Only the page-2 chunk reached the prompt.
    assert!(answer.answer.contains("twenty four months"));
    assert!(!answer.answer.contains("introduction"));
    assert!(!answer.answer.contains("appendix"));
}

#[tokio::test]
async fn top_snippet_tracks_the_matching_page_at_default_k() {
    let service = service();
    let id = ingest(&service, &THREE_PAGES).await;

    let warranty = service
        .queries
        .answer(&id, "how long does the warranty period last?")
        .await
        .expect("warranty answer");
    assert_eq!(warranty.snippets[0].page, 2);

    let appendix = service
        .queries
        .answer(&id, "where are the shipping addresses and contact details?")
        .await
        .expect("appendix answer");
    assert_eq!(appendix.snippets[0].page, 3);

    // Pages are distinct and ascending regardless of ranking.
    let mut sorted = warranty.source_pages.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(warranty.source_pages, sorted);
}

#[tokio::test]
async fn status_flips_from_pending_to_ready_with_index_entries() {
    let service = service();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("upload.pdf");
    write_test_pdf(&path, &["a single page of text"]);
    let bytes = std::fs::read(&path).expect("read pdf");

    let record = service
        .pipeline
        .accept_upload("upload.pdf", "application/pdf", &path, bytes)
        .await
        .expect("upload accepted");

    let before = service.queries.status(&record.id).await.expect("status");
    assert_eq!(before.status, DocumentStatus::Pending);
    assert!(!before.indexed);

    service
        .pipeline
        .run_ingestion(&record.id, &path)
        .await
        .expect("ingestion succeeds");

    let after = service.queries.status(&record.id).await.expect("status");
    assert_eq!(after.status, DocumentStatus::Ready);
    assert!(after.indexed);
}

#[tokio::test]
async fn deleted_document_is_gone_and_redelete_is_harmless() {
    let service = service();
    let id = ingest(&service, &["text that will soon be deleted"]).await;

    assert!(service.pipeline.delete_document(&id).await.expect("delete"));
    service.queries.invalidate(&id).await;

    let result = service.queries.answer(&id, "still there?").await;
    assert!(matches!(result, Err(QueryError::NotFound(_))));
    assert_eq!(service.index.entry_count(&id).await.expect("count"), 0);

    assert!(!service.pipeline.delete_document(&id).await.expect("redelete"));
}

#[tokio::test]
async fn question_history_accumulates_in_order() {
    let service = service();
    let id = ingest(&service, &["the delivery time is six weeks"]).await;

    service
        .queries
        .answer(&id, "what is the delivery time?")
        .await
        .expect("first answer");
    service
        .queries
        .answer(&id, "is six weeks negotiable?")
        .await
        .expect("second answer");

    // Audit writes are detached; poll until both have landed.
    let mut history = Vec::new();
    for _ in 0..50 {
        history = service
            .documents
            .question_history(&id)
            .await
            .expect("history");
        if history.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].question, "what is the delivery time?");
    assert_eq!(history[1].question, "is six weeks negotiable?");
}
