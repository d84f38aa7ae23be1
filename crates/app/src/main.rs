mod config;
mod error;
mod routes;
mod state;

use chrono::Utc;
use clap::Parser;
use config::{BackendMode, Config, EmbeddingBackend};
use pdf_qa_core::completions::RestCompletionClient;
use pdf_qa_core::embeddings::{Embedder, HashedEmbedder, RestEmbedder};
use pdf_qa_core::extractor::LopdfExtractor;
use pdf_qa_core::stores::memory::{MemoryBlobStore, MemoryDocumentStore, MemoryVectorIndex};
use pdf_qa_core::stores::{BucketObjectStore, PostgrestStore, QdrantStore};
use pdf_qa_core::traits::{BlobStore, CompletionModel, DocumentStore, VectorIndex};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let config = Config::parse();

    let embedder: Arc<dyn Embedder> = match config.embedding_backend {
        EmbeddingBackend::Hashed => Arc::new(HashedEmbedder::default()),
        EmbeddingBackend::Rest => Arc::new(RestEmbedder::new(
            &config.model_api_url,
            config.model_api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dimensions,
        )?),
    };
    let completion: Arc<dyn CompletionModel> = Arc::new(RestCompletionClient::new(
        &config.model_api_url,
        config.model_api_key.clone(),
        config.completion_model.clone(),
    )?);

    let (documents, blobs, index): (
        Arc<dyn DocumentStore>,
        Arc<dyn BlobStore>,
        Arc<dyn VectorIndex>,
    ) = match config.backend {
        BackendMode::Memory => (
            Arc::new(MemoryDocumentStore::default()),
            Arc::new(MemoryBlobStore::default()),
            Arc::new(MemoryVectorIndex::default()),
        ),
        BackendMode::Remote => {
            let qdrant = QdrantStore::new(
                &config.qdrant_url,
                config.qdrant_collection.clone(),
                embedder.dimensions(),
            )?;
            qdrant.ensure_collection().await?;

            (
                Arc::new(PostgrestStore::new(&config.postgrest_url, config.api_key())?),
                Arc::new(BucketObjectStore::new(
                    &config.storage_url,
                    config.storage_bucket.clone(),
                    config.api_key(),
                )?),
                Arc::new(qdrant),
            )
        }
    };

    let state = state::build_state(
        &config,
        documents,
        blobs,
        index,
        Arc::new(LopdfExtractor::default()),
        embedder,
        completion,
    );

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.bind,
        backend = ?config.backend,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-qa-server boot"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to install shutdown handler");
        return;
    }
    info!("shutdown signal received");
}
