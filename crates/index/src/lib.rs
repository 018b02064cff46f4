//! Document vector store: chunking, embedding, storage, and cosine search.
//!
//! The index is self-contained in its own SQLite file, produced by the
//! one-shot ingestion utility and consumed read-only by the document tool
//! service.

pub mod chunker;
pub mod embedding;
pub mod ingest;
pub mod store;

pub use chunker::{chunk_text, TextChunk};
pub use embedding::{Embedder, EmbeddingError, FastEmbedder, HashEmbedder};
pub use ingest::{ingest_document, IngestError, IngestReport};
pub use store::{ChunkStore, ScoredChunk, StoreError};
