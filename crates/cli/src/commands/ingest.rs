use std::fs;
use std::path::Path;

use factotum_core::config::{AppConfig, LoadOptions};
use factotum_core::init_logging;
use factotum_index::{ingest_document, ChunkStore, FastEmbedder};

use crate::commands::CommandResult;

pub fn run(file: &Path, source: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config.logging);

    let text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "read_document",
                format!("could not read `{}` as UTF-8 text: {error}", file.display()),
                4,
            );
        }
    };
    let source = source
        .map(str::to_string)
        .or_else(|| file.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| file.display().to_string());

    let embedder = match FastEmbedder::from_model_str(&config.index.embedding_model) {
        Ok(embedder) => embedder,
        Err(error) => {
            return CommandResult::failure("ingest", "embedding_model", error.to_string(), 5);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let store = ChunkStore::open(&config.index.url)
            .await
            .map_err(|error| ("index_open", error.to_string()))?;
        ingest_document(
            &store,
            &embedder,
            &source,
            &text,
            config.index.chunk_size,
            config.index.chunk_overlap,
        )
        .await
        .map_err(|error| ("ingestion", error.to_string()))
    });

    match result {
        Ok(report) => CommandResult::success(
            "ingest",
            format!(
                "indexed `{}` into `{}`: {} chunks from {} characters",
                report.source, config.index.url, report.chunks, report.characters
            ),
        ),
        Err((error_class, message)) => CommandResult::failure("ingest", error_class, message, 6),
    }
}
