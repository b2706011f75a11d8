//! FastEmbed embedding provider implementation.
//!
//! Runs the embedding model locally through the fastembed library, so neither
//! ingestion nor search needs network access. The default model is
//! AllMiniLML6V2 (384 dimensions), matching the corpus snapshot format.

use super::{l2_normalize, EmbeddingError, EmbeddingProvider, EmbeddingResult};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Default number of texts embedded per model invocation.
///
/// Bounds peak memory during corpus ingestion; has no effect on the
/// produced vectors.
pub const DEFAULT_CHUNK_SIZE: usize = 32;

/// Local embedding provider backed by fastembed.
#[derive(Clone)]
pub struct FastEmbedProvider {
    /// The model instance; fastembed requires `&mut` for inference
    model: Arc<Mutex<TextEmbedding>>,

    /// Model identifier
    model_name: String,

    /// Dimension of the produced vectors
    dimension: usize,

    /// Number of texts passed to the model per invocation
    chunk_size: usize,
}

impl FastEmbedProvider {
    /// Create a provider for the given model.
    ///
    /// # Arguments
    /// * `model` - Model to load (defaults to AllMiniLML6V2, 384 dimensions)
    /// * `cache_dir` - Directory for downloaded model files
    ///
    /// # Errors
    /// Returns `EmbeddingError::Config` if the model cannot be initialized.
    pub fn new(model: Option<EmbeddingModel>, cache_dir: Option<PathBuf>) -> EmbeddingResult<Self> {
        let model_type = model.unwrap_or(EmbeddingModel::AllMiniLML6V2);
        let model_name = format!("{:?}", model_type);

        let dimension = match model_type {
            EmbeddingModel::AllMiniLML6V2 => crate::DEFAULT_EMBEDDING_DIMENSION,
            EmbeddingModel::BGESmallENV15 => 384,
            EmbeddingModel::BGEBaseENV15 => 768,
            EmbeddingModel::BGELargeENV15 => 1024,
            EmbeddingModel::NomicEmbedTextV1 => 768,
            EmbeddingModel::NomicEmbedTextV15 => 768,
            EmbeddingModel::ParaphraseMLMiniLML12V2 => 384,
            EmbeddingModel::ParaphraseMLMpnetBaseV2 => 768,
            _ => crate::DEFAULT_EMBEDDING_DIMENSION,
        };

        let mut init_options = InitOptions::new(model_type);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(dir);
        }

        let text_embedding = TextEmbedding::try_new(init_options).map_err(|e| {
            EmbeddingError::Config(format!("failed to initialize fastembed model: {}", e))
        })?;

        debug!(model = %model_name, dimension, "embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            model_name,
            dimension,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Create a provider with the default model and cache location.
    pub fn with_defaults() -> EmbeddingResult<Self> {
        Self::new(None, None)
    }

    /// Override the batch chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut model = self.model.lock().await;
        let embeddings = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let mut vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("model returned no embedding".to_string()))?;
        l2_normalize(&mut vector);
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut model = self.model.lock().await;
        let mut results = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.chunk_size) {
            let chunk_strings: Vec<String> = chunk.iter().map(|&s| s.to_string()).collect();
            let embeddings = model
                .embed(chunk_strings, None)
                .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
            for mut vector in embeddings {
                l2_normalize(&mut vector);
                results.push(vector);
            }
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

// TextEmbedding does not implement Debug
impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
