use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tokio::task;
use tracing::info;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to initialize embedding model: {0}")]
    ModelInit(String),
    #[error("failed to generate embeddings: {0}")]
    Generation(String),
    #[error("embedding task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Seam over the embedding backend so tool-service and controller tests
/// never download a model.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Production embedder backed by fastembed. The model is lazily loaded on
/// first use and shared across calls; generation runs on the blocking pool
/// since fastembed is synchronous.
pub struct FastEmbedder {
    model_name: EmbeddingModel,
    dimension: usize,
    model: OnceCell<Arc<TextEmbedding>>,
}

impl FastEmbedder {
    pub fn new(model_name: EmbeddingModel) -> Self {
        let dimension = match model_name {
            EmbeddingModel::AllMiniLML6V2 | EmbeddingModel::AllMiniLML6V2Q => 384,
            EmbeddingModel::BGESmallENV15 | EmbeddingModel::BGESmallENV15Q => 384,
            EmbeddingModel::BGEBaseENV15 | EmbeddingModel::BGEBaseENV15Q => 768,
            _ => 384,
        };
        Self { model_name, dimension, model: OnceCell::new() }
    }

    pub fn from_model_str(model_name: &str) -> Result<Self, EmbeddingError> {
        let model = match model_name {
            "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            other => {
                return Err(EmbeddingError::ModelInit(format!(
                    "unknown embedding model `{other}` (supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5)"
                )))
            }
        };
        Ok(Self::new(model))
    }

    fn get_or_init_model(&self) -> Result<Arc<TextEmbedding>, EmbeddingError> {
        self.model
            .get_or_try_init(|| {
                info!(model = ?self.model_name, "initializing embedding model");
                let options =
                    InitOptions::new(self.model_name.clone()).with_show_download_progress(false);
                let model = TextEmbedding::try_new(options)
                    .map_err(|error| EmbeddingError::ModelInit(error.to_string()))?;
                Ok(Arc::new(model))
            })
            .cloned()
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Generation("empty embedding result".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.get_or_init_model()?;
        let texts = texts.to_vec();
        let embeddings = task::spawn_blocking(move || {
            model
                .embed(texts, None)
                .map_err(|error| EmbeddingError::Generation(error.to_string()))
        })
        .await??;
        Ok(embeddings)
    }
}

/// Deterministic, dependency-free embedder: hashes character trigrams into
/// a fixed number of buckets. Similar texts land on similar vectors, which
/// is all the hermetic tests and offline demos need.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "dimension must be positive");
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();
        for window in chars.windows(3) {
            let mut hash: u64 = 1469598103934665603;
            for ch in window {
                hash ^= *ch as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }
}
