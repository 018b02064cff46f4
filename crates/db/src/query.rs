use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use thiserror::Error;
use tracing::debug;

use crate::connection::DbPool;

/// Explicit indication returned instead of an error when a valid query
/// matches no rows.
pub const NO_ROWS_MESSAGE: &str = "Query executed successfully, but returned no results.";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("only SELECT statements may be executed, got: {0}")]
    NotReadonly(String),
    #[error("query execution failed: {0}")]
    Execution(#[from] sqlx::Error),
}

/// Concatenated `CREATE TABLE` statements for the whole store, used as
/// prompt context for SQL generation.
pub async fn schema_summary(pool: &DbPool) -> Result<String, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND sql IS NOT NULL ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let statements: Vec<String> =
        rows.iter().filter_map(|row| row.try_get::<String, _>("sql").ok()).collect();
    Ok(statements.join("\n"))
}

/// Execute a SELECT statement and render its result as text: a column
/// header line followed by one line per row. Rejects anything that is not
/// a SELECT before touching the database.
pub async fn execute_readonly(pool: &DbPool, sql: &str) -> Result<String, QueryError> {
    let trimmed = sql.trim();
    if !trimmed.to_ascii_lowercase().starts_with("select") {
        return Err(QueryError::NotReadonly(trimmed.to_string()));
    }

    debug!(sql = trimmed, "executing read-only query");
    let rows = sqlx::query(trimmed).fetch_all(pool).await?;

    if rows.is_empty() {
        return Ok(NO_ROWS_MESSAGE.to_string());
    }

    let columns: Vec<String> =
        rows[0].columns().iter().map(|column| column.name().to_string()).collect();
    let mut output = format!("Query Result:\nColumns: {}", columns.join(", "));
    for row in &rows {
        let mut rendered = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            rendered.push(render_value(row, index)?);
        }
        output.push('\n');
        output.push_str(&rendered.join(", "));
    }
    Ok(output)
}

/// Render one cell of a dynamically typed SQLite row.
fn render_value(row: &SqliteRow, index: usize) -> Result<String, QueryError> {
    let raw = row.try_get_raw(index).map_err(sqlx::Error::from)?;
    if raw.is_null() {
        return Ok("NULL".to_string());
    }
    let rendered = match raw.type_info().name() {
        "TEXT" => row.try_get::<String, _>(index)?,
        "INTEGER" => row.try_get::<i64, _>(index)?.to_string(),
        "REAL" => row.try_get::<f64, _>(index)?.to_string(),
        "BLOB" => format!("<{} bytes>", row.try_get::<Vec<u8>, _>(index)?.len()),
        other => format!("<unsupported {other}>"),
    };
    Ok(rendered)
}
