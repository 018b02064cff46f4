//! `factotum-doc-tool`: serves the `document_search` tool over HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use factotum_core::config::{AppConfig, LoadOptions};
use factotum_core::init_logging;
use factotum_index::{ChunkStore, FastEmbedder};
use factotum_tools::{serve, DocumentToolService};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging);
    tracing::info!(config = %config.redacted_summary(), "effective configuration");

    let store = ChunkStore::open(&config.index.url)
        .await
        .with_context(|| format!("failed to open document index at {}", config.index.url))?;
    if store.count().await? == 0 {
        warn!(
            index = config.index.url,
            "document index is empty, run `factotum ingest <file>` first"
        );
    }

    let embedder = Arc::new(FastEmbedder::from_model_str(&config.index.embedding_model)?);
    let service = Arc::new(DocumentToolService::new(store, embedder, config.index.top_k));

    serve(&config.tools.document_bind_address, service)
        .await
        .context("document tool service terminated")?;
    Ok(())
}
