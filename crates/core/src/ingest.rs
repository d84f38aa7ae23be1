use crate::chunking::{chunk_pages, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::{DependencyError, IngestError};
use crate::extractor::{PageText, PdfExtractor};
use crate::indexer::IndexBuilder;
use crate::models::{ChunkStrategy, DocumentRecord, IngestionOptions, PageChunk};
use crate::traits::{BlobStore, DocumentStore, VectorIndex};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Coordinates the ingestion pipeline per uploaded document:
/// a synchronous acceptance step (validate, store blob, insert row)
/// and a background job walking extract → chunk → index → ready.
pub struct IngestionPipeline {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn VectorIndex>,
    extractor: Arc<dyn PdfExtractor>,
    builder: IndexBuilder,
    options: IngestionOptions,
}

impl IngestionPipeline {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn VectorIndex>,
        extractor: Arc<dyn PdfExtractor>,
        embedder: Arc<dyn Embedder>,
        options: IngestionOptions,
    ) -> Self {
        let builder = IndexBuilder::new(embedder, Arc::clone(&index), options.batch_size);
        Self {
            documents,
            blobs,
            index,
            extractor,
            builder,
            options,
        }
    }

    /// Synchronous portion of an upload. Validation runs before
    /// anything is persisted, so a rejected file leaves no row, no
    /// blob, and no index entries behind.
    pub async fn accept_upload(
        &self,
        filename: &str,
        content_type: &str,
        path: &Path,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord, IngestError> {
        let spooled = path.to_path_buf();
        let page_count =
            tokio::task::spawn_blocking(move || crate::extractor::validate_pdf(&spooled)).await??;

        let fingerprint = format!("{:x}", Sha256::digest(&bytes));
        let record = DocumentRecord::accepted(Uuid::new_v4().simple().to_string(), filename);
        self.blobs
            .put_document(&record.id, bytes, content_type)
            .await?;
        if let Err(insert_error) = self.documents.insert_document(&record).await {
            // The blob landed but the row did not; remove it so the
            // failed upload leaves nothing behind.
            if let Err(cleanup_error) = self.blobs.delete_document(&record.id).await {
                warn!(
                    document_id = %record.id,
                    error = %cleanup_error,
                    "failed to remove blob after row insert error"
                );
            }
            return Err(insert_error.into());
        }

        info!(
            document_id = %record.id,
            filename,
            page_count,
            content_sha256 = %fingerprint,
            "upload accepted, ingestion scheduled"
        );
        Ok(record)
    }

    /// Background portion of an upload. Any failure marks the document
    /// `failed` and removes whatever index entries the broken run left,
    /// so queries never see a half-built index.
    pub async fn run_ingestion(&self, document_id: &str, path: &Path) -> Result<(), IngestError> {
        match self.run_stages(document_id, path).await {
            Ok(chunk_count) => {
                info!(document_id, chunk_count, "ingestion complete, document ready");
                Ok(())
            }
            Err(ingest_error) => {
                if let Err(cleanup_error) = self.index.delete_document(document_id).await {
                    warn!(document_id, error = %cleanup_error, "failed to clear partial index");
                }
                if let Err(status_error) = self.documents.mark_failed(document_id).await {
                    warn!(document_id, error = %status_error, "failed to record failed status");
                }
                error!(document_id, error = %ingest_error, "ingestion failed");
                Err(ingest_error)
            }
        }
    }

    async fn run_stages(&self, document_id: &str, path: &Path) -> Result<usize, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let spooled: PathBuf = path.to_path_buf();
        let pages =
            tokio::task::spawn_blocking(move || extractor.extract_pages(&spooled, true)).await??;

        let chunks = self.chunk_document(document_id, &pages)?;
        if chunks.is_empty() {
            return Err(IngestError::InvalidDocument(format!(
                "no chunkable text in document {document_id}"
            )));
        }

        self.builder.build(document_id, &chunks).await?;

        let content = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.documents.mark_ready(document_id, &content).await?;

        Ok(chunks.len())
    }

    /// Apply the configured strategy; a semantic run that produces no
    /// chunks falls back to fixed windows before giving up.
    pub fn chunk_document(
        &self,
        document_id: &str,
        pages: &[PageText],
    ) -> Result<Vec<PageChunk>, IngestError> {
        let config = ChunkingConfig::from(&self.options);
        let chunks = chunk_pages(document_id, pages, self.options.strategy, config)?;

        if chunks.is_empty() && self.options.strategy == ChunkStrategy::Semantic {
            warn!(document_id, "semantic chunking found nothing, falling back to fixed windows");
            return chunk_pages(document_id, pages, ChunkStrategy::FixedWindow, config);
        }

        Ok(chunks)
    }

    /// Remove the blob, index entries, metadata row, and question
    /// history for a document. Deleting an id that does not exist is
    /// not an error; the call reports whether the document was there.
    pub async fn delete_document(&self, document_id: &str) -> Result<bool, DependencyError> {
        let existed = self
            .documents
            .fetch_document(document_id)
            .await?
            .is_some();

        self.blobs.delete_document(document_id).await?;
        self.index.delete_document(document_id).await?;
        self.documents.delete_questions(document_id).await?;
        self.documents.delete_document(document_id).await?;

        info!(document_id, existed, "document deleted");
        Ok(existed)
    }
}
