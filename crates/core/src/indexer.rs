use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::models::{IndexEntry, PageChunk};
use crate::traits::VectorIndex;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Turns chunks into index entries batch by batch. Each batch is
/// embedded and upserted as one request, so a failure partway through
/// leaves every earlier batch committed and retryable work bounded to
/// the batch that broke. Not deduplicating: running it twice for the
/// same document appends duplicate entries.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, batch_size: usize) -> Self {
        Self {
            embedder,
            index,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn build(&self, document_id: &str, chunks: &[PageChunk]) -> Result<(), IngestError> {
        let total_batches = chunks.len().div_ceil(self.batch_size.max(1));

        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            let entries: Vec<IndexEntry> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry {
                    id: Uuid::new_v4().to_string(),
                    document_id: document_id.to_string(),
                    page: chunk.page,
                    text: chunk.text.clone(),
                    vector,
                })
                .collect();

            self.index.upsert_entries(&entries).await?;
            debug!(
                document_id,
                batch = batch_no + 1,
                total_batches,
                entries = entries.len(),
                "index batch committed"
            );
        }

        Ok(())
    }
}
