use thiserror::Error;
use tracing::info;

use crate::chunker::chunk_text;
use crate::embedding::{Embedder, EmbeddingError};
use crate::store::{ChunkStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("document `{0}` contained no ingestible text")]
    EmptyDocument(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestReport {
    pub source: String,
    pub characters: usize,
    pub chunks: usize,
}

/// One-shot ingestion: chunk the document, embed every chunk in batch, and
/// replace any previous build of the same source.
pub async fn ingest_document(
    store: &ChunkStore,
    embedder: &dyn Embedder,
    source: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<IngestReport, IngestError> {
    let chunks = chunk_text(text, chunk_size, chunk_overlap);
    if chunks.is_empty() {
        return Err(IngestError::EmptyDocument(source.to_string()));
    }

    let contents: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let embeddings = embedder.embed_batch(&contents).await?;

    store.wipe_source(source).await?;
    store.add_chunks(source, &chunks, &embeddings).await?;

    let report =
        IngestReport { source: source.to_string(), characters: text.len(), chunks: chunks.len() };
    info!(source, chunks = report.chunks, characters = report.characters, "document ingested");
    Ok(report)
}
