pub mod memory;
pub mod object;
pub mod postgrest;
pub mod qdrant;

pub use memory::{MemoryBlobStore, MemoryDocumentStore, MemoryVectorIndex};
pub use object::BucketObjectStore;
pub use postgrest::PostgrestStore;
pub use qdrant::QdrantStore;
