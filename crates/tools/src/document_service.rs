//! The `document_search` tool: semantic retrieval over the ingested
//! document index. Embeds the question, ranks chunks by cosine similarity,
//! and returns the top passages as one context block.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use factotum_core::domain::{ToolDescriptor, DOC_TOOL_NAME};
use factotum_core::errors::ToolError;
use factotum_index::{ChunkStore, Embedder, StoreError};

use crate::wire::ToolService;

/// Explicit indication returned instead of an error when no chunk is
/// relevant to the question.
pub const NO_MATCH_MESSAGE: &str =
    "No relevant information was found in the document for that query.";

const CHUNK_SEPARATOR: &str = "\n---\n";

pub struct DocumentToolService {
    store: ChunkStore,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl DocumentToolService {
    pub fn new(store: ChunkStore, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self { store, embedder, top_k }
    }
}

#[async_trait]
impl ToolService for DocumentToolService {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: DOC_TOOL_NAME.to_string(),
            description: "Searches the ingested report document and returns the \
                          passages most relevant to the question."
                .to_string(),
            input_schema: ToolDescriptor::question_schema(),
        }
    }

    async fn answer(&self, question: &str) -> Result<String, ToolError> {
        let query_embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|error| ToolError::Provider(format!("embedding failed: {error}")))?;

        let hits = self.store.search(&query_embedding, self.top_k).await.map_err(
            |error| match error {
                StoreError::Database(db) => ToolError::Unreachable {
                    name: DOC_TOOL_NAME.to_string(),
                    detail: format!("index is unavailable: {db}"),
                },
                StoreError::CorruptEmbedding(detail) => ToolError::Unreachable {
                    name: DOC_TOOL_NAME.to_string(),
                    detail: format!("index is corrupt: {detail}"),
                },
            },
        )?;

        if hits.is_empty() {
            return Ok(NO_MATCH_MESSAGE.to_string());
        }

        debug!(hits = hits.len(), top_score = hits[0].score, "retrieved context");
        let passages: Vec<&str> = hits.iter().map(|hit| hit.content.as_str()).collect();
        Ok(format!("Retrieved context:\n{}", passages.join(CHUNK_SEPARATOR)))
    }
}
