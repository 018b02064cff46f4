//! `factotum-sql-tool`: serves the `company_database` tool over HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use factotum_core::config::{AppConfig, LoadOptions};
use factotum_core::init_logging;
use factotum_db::{connect_with_settings, migrations, SeedDataset};
use factotum_llm::GeminiClient;
use factotum_tools::{serve, SqlToolService};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging);
    info!(config = %config.redacted_summary(), "effective configuration");

    // Query generation needs the credential; refuse to start without it.
    config.require_llm_credential()?;

    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .with_context(|| format!("failed to open fact store at {}", config.database.url))?;
    migrations::run_pending(&pool).await.context("failed to run fact store migrations")?;

    let verification = SeedDataset::verify(&pool).await?;
    if !verification.passed {
        info!(failures = ?verification.failures, "fact store incomplete, reseeding");
        SeedDataset::apply(&pool).await.context("failed to seed fact store")?;
    }

    let llm = Arc::new(GeminiClient::from_config(&config.llm)?);
    let service = Arc::new(SqlToolService::new(pool, llm));

    serve(&config.tools.sql_bind_address, service)
        .await
        .context("sql tool service terminated")?;
    Ok(())
}
