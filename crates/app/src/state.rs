use crate::config::Config;
use pdf_qa_core::cache::RetrieverCache;
use pdf_qa_core::embeddings::Embedder;
use pdf_qa_core::extractor::PdfExtractor;
use pdf_qa_core::ingest::IngestionPipeline;
use pdf_qa_core::models::IngestionOptions;
use pdf_qa_core::query::QueryOrchestrator;
use pdf_qa_core::synthesizer::AnswerSynthesizer;
use pdf_qa_core::traits::{BlobStore, CompletionModel, DocumentStore, VectorIndex};
use std::sync::Arc;

/// Shared handler state: the ingestion pipeline and the query
/// orchestrator, both over the same backend trio.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub queries: Arc<QueryOrchestrator>,
}

#[allow(clippy::too_many_arguments)]
pub fn build_state(
    config: &Config,
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn VectorIndex>,
    extractor: Arc<dyn PdfExtractor>,
    embedder: Arc<dyn Embedder>,
    completion: Arc<dyn CompletionModel>,
) -> AppState {
    let options = IngestionOptions {
        strategy: config.chunk_strategy.into(),
        chunk_size: config.chunk_size,
        overlap: config.chunk_overlap,
        max_chunk_size: config.chunk_size,
        ..IngestionOptions::default()
    };

    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(&documents),
        blobs,
        Arc::clone(&index),
        extractor,
        Arc::clone(&embedder),
        options,
    ));

    let retrievers = RetrieverCache::new(
        embedder,
        Arc::clone(&index),
        config.retriever_cache_capacity,
    );
    let queries = Arc::new(QueryOrchestrator::new(
        documents,
        index,
        retrievers,
        AnswerSynthesizer::new(completion),
        config.top_k,
        config.query_deadline(),
        config.list_cache_ttl(),
    ));

    AppState { pipeline, queries }
}
