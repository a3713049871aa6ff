//! Trait definitions and error type for the similarity domain.
//!
//! The embedding provider sits behind a trait so tests can substitute a mock.

use async_trait::async_trait;

/// Error type for similarity operations.
#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingError(String),

    #[error("Index is empty")]
    EmptyIndex,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, SimilarityError>;

/// Trait for text embedding generation.
///
/// Abstracts the embedding provider (OpenAI, mocks) for easy testing.
///
/// # Example
///
/// ```ignore
/// let embedder = OpenAiEmbedder::new(&settings.openai);
/// let embedding = embedder.embed("payment gateway timeout").await?;
/// assert_eq!(embedding.len(), 1536);
/// ```
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one vector per input, in
    /// input order.
    ///
    /// Default implementation calls `embed` sequentially. Implementations
    /// should override with a real batch call.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Returns the embedding dimensions for this embedder.
    #[allow(dead_code)]
    fn dimensions(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify the trait is object-safe (can be used as a trait object)
    fn _assert_embedder_object_safe(_: &dyn Embedder) {}

    #[test]
    fn dimension_mismatch_message_names_both_sizes() {
        let err = SimilarityError::DimensionMismatch {
            expected: 3,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 3, got 5"
        );
    }
}
