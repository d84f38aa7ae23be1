pub mod cache;
pub mod chunking;
pub mod completions;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod indexer;
pub mod ingest;
pub mod jobs;
pub mod models;
pub mod query;
pub mod retriever;
pub mod stores;
pub mod synthesizer;
pub mod traits;

pub use cache::{ListCache, RetrieverCache, DEFAULT_RETRIEVER_CAPACITY};
pub use chunking::{chunk_fixed_window, chunk_pages, chunk_semantic, clean_text, ChunkingConfig};
pub use completions::{RestCompletionClient, DEFAULT_COMPLETION_MODEL};
pub use embeddings::{Embedder, HashedEmbedder, RestEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{DependencyError, IngestError, QueryError};
pub use extractor::{validate_pdf, LopdfExtractor, PageText, PdfExtractor};
pub use indexer::{IndexBuilder, DEFAULT_BATCH_SIZE};
pub use ingest::IngestionPipeline;
pub use jobs::spawn_detached;
pub use models::{
    ChunkStrategy, DocumentMeta, DocumentRecord, DocumentStatus, DocumentStatusReport,
    IngestionOptions, IndexEntry, PageChunk, QaAnswer, QuestionRecord, RetrievedChunk, Snippet,
};
pub use query::{
    QueryOrchestrator, DEFAULT_LIST_CACHE_TTL, DEFAULT_QUERY_DEADLINE, DEFAULT_TOP_K,
};
pub use retriever::RetrieverHandle;
pub use stores::{BucketObjectStore, PostgrestStore, QdrantStore};
pub use synthesizer::AnswerSynthesizer;
pub use traits::{BlobStore, CompletionModel, DocumentStore, VectorIndex};
