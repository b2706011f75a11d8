//! Embedding provider abstraction and implementations.
//!
//! This module defines the interface for text embedding generation and
//! provides a local implementation backed by the fastembed library.
//!
//! Providers are deterministic with respect to a fixed model version:
//! identical input text yields an identical output vector. All vectors
//! returned from this module are L2-normalized, so cosine similarity between
//! them reduces to a plain dot product.

pub mod fastembed;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Input text was empty or whitespace-only
    #[error("Empty input: text must contain at least one non-whitespace character")]
    EmptyInput,

    /// Model inference failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Model could not be loaded or configured
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Trait for text embedding providers.
///
/// Implementors generate fixed-dimension vector embeddings from text. The
/// trait is async so that providers backed by remote services fit the same
/// interface as local models. Providers are expensive to construct and cheap
/// to invoke; callers hold one instance in an `Arc` for the process lifetime.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an L2-normalized embedding vector for the given text.
    ///
    /// # Errors
    /// Returns `EmbeddingError::EmptyInput` for empty or whitespace-only
    /// input, or `EmbeddingError::Inference` if the model fails.
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Generate L2-normalized embeddings for multiple texts, in input order.
    ///
    /// Implementations chunk large batches internally to bound peak memory;
    /// the chunk size affects throughput, never output values.
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Dimension of the vectors produced by this provider.
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;
}

/// Scale a vector in place to unit L2 norm.
///
/// Zero vectors are left unchanged; there is no meaningful direction to
/// preserve and dividing by zero would poison every later dot product.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// L2 norm of a vector.
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_produces_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn normalized_self_similarity_is_one() {
        let mut v = vec![0.2, -1.3, 0.7, 2.1];
        l2_normalize(&mut v);
        let dot: f32 = v.iter().map(|x| x * x).sum();
        assert!((dot - 1.0).abs() < 1e-6);
    }
}
