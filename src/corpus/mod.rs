//! Document store: corpus ingestion and chunking.

mod chunker;
mod loader;

pub use chunker::{chunk_corpus, chunk_document, Chunk, ChunkingConfig};
pub use loader::{load_documents, Document};
