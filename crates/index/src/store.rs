use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use thiserror::Error;
use tracing::{debug, info};

use crate::chunker::TextChunk;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored embedding is corrupt: {0}")]
    CorruptEmbedding(String),
}

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredChunk {
    pub content: String,
    pub source: String,
    pub chunk_index: i64,
    pub start_offset: i64,
    pub score: f32,
}

/// SQLite-backed chunk store. The index owns its schema and creates it on
/// open, so an ingested index file is self-contained.
pub struct ChunkStore {
    pool: sqlx::SqlitePool,
}

impl ChunkStore {
    pub async fn open(index_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect(index_url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS document_chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                start_offset INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_document_chunks_source ON document_chunks(source)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Drop all chunks for a source, for a fresh rebuild at ingestion time.
    pub async fn wipe_source(&self, source: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM document_chunks WHERE source = ?")
            .bind(source)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            info!(source, removed = result.rows_affected(), "replaced existing index build");
        }
        Ok(result.rows_affected())
    }

    pub async fn add_chunks(
        &self,
        source: &str,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        debug_assert_eq!(chunks.len(), embeddings.len());
        let mut tx = self.pool.begin().await?;
        for (index, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            sqlx::query(
                "INSERT INTO document_chunks (source, chunk_index, start_offset, content, embedding)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(source)
            .bind(index as i64)
            .bind(chunk.start_offset as i64)
            .bind(&chunk.content)
            .bind(encode_embedding(embedding))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query("SELECT COUNT(*) AS count FROM document_chunks")
            .fetch_one(&self.pool)
            .await?
            .get::<i64, _>("count");
        Ok(count)
    }

    /// Brute-force nearest-neighbor scan: cosine similarity against every
    /// stored vector, best first. The corpus is one document, so a linear
    /// scan is the whole search story.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let rows = sqlx::query(
            "SELECT source, chunk_index, start_offset, content, embedding FROM document_chunks",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.get("embedding");
            let embedding = decode_embedding(&blob)?;
            if embedding.len() != query_embedding.len() {
                return Err(StoreError::CorruptEmbedding(format!(
                    "dimension mismatch: stored {} vs query {}",
                    embedding.len(),
                    query_embedding.len()
                )));
            }
            scored.push(ScoredChunk {
                content: row.get("content"),
                source: row.get("source"),
                chunk_index: row.get("chunk_index"),
                start_offset: row.get("start_offset"),
                score: cosine_similarity(query_embedding, &embedding),
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        debug!(results = scored.len(), "vector search complete");
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::CorruptEmbedding(format!(
            "blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
