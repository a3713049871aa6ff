//! Mock embedder implementation for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::domain::similarity::traits::{Embedder, Result, SimilarityError};

/// Mock embedder that returns configurable vectors.
///
/// # Examples
///
/// ```ignore
/// // Return a fixed vector
/// let embedder = MockEmbedder::returning(vec![0.1; 1536]);
///
/// // Return different vectors for each call
/// let embedder = MockEmbedder::with_sequence(vec![
///     vec![0.1; 1536],
///     vec![0.2; 1536],
/// ]);
/// ```
#[derive(Clone)]
pub struct MockEmbedder {
    responses: Arc<Vec<Vec<f32>>>,
    call_count: Arc<AtomicUsize>,
    fail: bool,
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a mock that always returns the same vector.
    pub fn returning(vector: Vec<f32>) -> Self {
        let dims = vector.len();
        Self {
            responses: Arc::new(vec![vector]),
            call_count: Arc::new(AtomicUsize::new(0)),
            fail: false,
            dimensions: dims,
        }
    }

    /// Create a mock that returns vectors in sequence.
    ///
    /// Wraps around if more calls are made than vectors provided.
    pub fn with_sequence(vectors: Vec<Vec<f32>>) -> Self {
        let dims = vectors.first().map(|v| v.len()).unwrap_or(1536);
        Self {
            responses: Arc::new(vectors),
            call_count: Arc::new(AtomicUsize::new(0)),
            fail: false,
            dimensions: dims,
        }
    }

    /// Create a mock whose every call fails with an embedding error.
    pub fn failing() -> Self {
        Self {
            responses: Arc::new(vec![vec![0.0]]),
            call_count: Arc::new(AtomicUsize::new(0)),
            fail: true,
            dimensions: 1,
        }
    }

    /// Get the number of times `embed` or `embed_batch` was called
    /// (batch calls count once per input).
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::returning(vec![0.0; 1536])
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SimilarityError::EmbeddingError(
                "mock embedder configured to fail".to_string(),
            ));
        }
        let response_idx = idx % self.responses.len();
        Ok(self.responses[response_idx].clone())
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_fixed_vector() {
        let embedder = MockEmbedder::returning(vec![1.0, 2.0, 3.0]);

        let result = embedder.embed("test").await.unwrap();
        assert_eq!(result, vec![1.0, 2.0, 3.0]);

        let result = embedder.embed("another").await.unwrap();
        assert_eq!(result, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn mock_returns_sequence_and_wraps() {
        let embedder =
            MockEmbedder::with_sequence(vec![vec![1.0], vec![2.0], vec![3.0]]);

        assert_eq!(embedder.embed("a").await.unwrap(), vec![1.0]);
        assert_eq!(embedder.embed("b").await.unwrap(), vec![2.0]);
        assert_eq!(embedder.embed("c").await.unwrap(), vec![3.0]);
        assert_eq!(embedder.embed("d").await.unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn mock_tracks_call_count_per_input() {
        let embedder = MockEmbedder::default();

        embedder.embed("a").await.unwrap();
        embedder.embed_batch(&["b", "c", "d"]).await.unwrap();
        assert_eq!(embedder.call_count(), 4);
    }

    #[tokio::test]
    async fn failing_mock_errors() {
        let embedder = MockEmbedder::failing();
        assert!(embedder.embed("a").await.is_err());
    }
}
