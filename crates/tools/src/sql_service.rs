//! The `company_database` tool: text-to-SQL over the read-only fact store.
//!
//! Per question: fetch the live schema, ask the LLM for a single SELECT,
//! guard it, execute it, and return the rendered rows. The generated SQL
//! never leaves this service; callers only see rendered results.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use factotum_core::domain::{ToolDescriptor, SQL_TOOL_NAME};
use factotum_core::errors::ToolError;
use factotum_db::{execute_readonly, schema_summary, DbPool, QueryError};
use factotum_llm::{ChatMessage, ChatRequest, LlmClient, LlmError};

use crate::wire::ToolService;

pub struct SqlToolService {
    pool: DbPool,
    llm: Arc<dyn LlmClient>,
}

#[derive(Deserialize)]
struct GeneratedQuery {
    query: String,
}

impl SqlToolService {
    pub fn new(pool: DbPool, llm: Arc<dyn LlmClient>) -> Self {
        Self { pool, llm }
    }

    async fn generate_sql(&self, schema: &str, question: &str) -> Result<String, ToolError> {
        let reply = self
            .llm
            .complete(ChatRequest {
                system: format!(
                    "You are an expert SQLite analyst. Given the schema below, write \
                     one SELECT statement that answers the user's question. Reply with \
                     only a JSON object of the form {{\"query\": \"SELECT ...\"}}. \
                     Never write INSERT, UPDATE, DELETE, or DDL.\n\nSchema:\n{schema}"
                ),
                messages: vec![ChatMessage::user(question)],
                tools: Vec::new(),
            })
            .await
            .map_err(|error| match error {
                LlmError::MissingCredential => {
                    ToolError::Provider("missing LLM credential".to_string())
                }
                other => ToolError::Provider(other.to_string()),
            })?;

        parse_generated_sql(reply.text_or_empty())
    }
}

/// Accepts either the requested `{"query": ...}` object, optionally inside
/// a markdown fence, or bare SQL when the model skips the wrapper.
fn parse_generated_sql(text: &str) -> Result<String, ToolError> {
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```sql")
        .trim_matches('`')
        .trim();

    if let Ok(generated) = serde_json::from_str::<GeneratedQuery>(cleaned) {
        return Ok(generated.query.trim().to_string());
    }
    if cleaned.to_lowercase().starts_with("select") {
        return Ok(cleaned.to_string());
    }
    Err(ToolError::QueryGeneration(format!(
        "model did not produce a SELECT statement: {}",
        truncate(cleaned, 160)
    )))
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(limit).collect();
        format!("{prefix}...")
    }
}

#[async_trait]
impl ToolService for SqlToolService {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: SQL_TOOL_NAME.to_string(),
            description: "Answers questions about company data: employees, their \
                          departments and salaries, products and prices, and sales \
                          figures."
                .to_string(),
            input_schema: ToolDescriptor::question_schema(),
        }
    }

    async fn answer(&self, question: &str) -> Result<String, ToolError> {
        let schema = schema_summary(&self.pool).await.map_err(|error| {
            ToolError::Unreachable {
                name: SQL_TOOL_NAME.to_string(),
                detail: format!("fact store is unavailable: {error}"),
            }
        })?;

        let sql = self.generate_sql(&schema, question).await?;
        debug!(sql, "generated query");

        match execute_readonly(&self.pool, &sql).await {
            Ok(rendered) => Ok(rendered),
            Err(QueryError::NotReadonly(statement)) => {
                warn!(statement, "rejected non-SELECT statement");
                Err(ToolError::QueryGeneration(format!(
                    "generated statement is not a SELECT: {}",
                    truncate(&statement, 160)
                )))
            }
            // Execution errors are usually the model's SQL, not the store.
            Err(QueryError::Execution(error)) => Err(ToolError::QueryGeneration(format!(
                "generated query failed to execute: {error}"
            ))),
        }
    }
}
