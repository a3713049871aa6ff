//! Similarity engine: turns a free-text query into ranked, thresholded
//! matches against the published index snapshot.

use std::sync::Arc;

use tracing::debug;

use super::index::VectorIndex;
use super::traits::{Embedder, Result, SimilarityError};
use super::types::SimilarityResult;
use crate::config::SimilaritySettings;

/// Configuration for the similarity engine.
#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    /// Minimum score for a search match
    pub threshold: f64,
    /// Stricter cutoff that suppresses ticket creation
    pub duplicate_threshold: f64,
    /// Maximum number of results per query
    pub max_results: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            duplicate_threshold: 0.9,
            max_results: 5,
        }
    }
}

impl From<&SimilaritySettings> for SimilarityConfig {
    fn from(settings: &SimilaritySettings) -> Self {
        Self {
            threshold: settings.threshold,
            duplicate_threshold: settings.duplicate_threshold,
            max_results: settings.max_results,
        }
    }
}

/// Convert a squared Euclidean distance to a similarity score.
///
/// Distance 0 maps to 1.0 and the score asymptotically approaches 0 as the
/// distance grows. The transform must stay exactly `1 / (1 + d)` for
/// compatibility with the stored thresholds.
pub(crate) fn score_from_distance(distance: f32) -> f64 {
    1.0 / (1.0 + distance as f64)
}

/// Search service over the vector index.
///
/// # Type Parameters
///
/// * `E` - Embedder implementation for generating query embeddings
pub struct SimilarityEngine<E>
where
    E: Embedder,
{
    embedder: E,
    index: Arc<VectorIndex>,
    config: SimilarityConfig,
}

impl<E> SimilarityEngine<E>
where
    E: Embedder,
{
    pub fn new(embedder: E, index: Arc<VectorIndex>, config: SimilarityConfig) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Find tickets similar to `query`, ranked by descending score.
    ///
    /// Entries below the search threshold are dropped. An empty index and a
    /// query that nothing clears are both normal outcomes and return an
    /// empty list, never an error.
    pub async fn search(&self, query: &str) -> Result<Vec<SimilarityResult>> {
        let snapshot = self.index.snapshot();
        if snapshot.is_empty() {
            return Ok(vec![]);
        }

        let embedding = self.embedder.embed(query).await?;

        let hits = match snapshot.query(&embedding, self.config.max_results) {
            Ok(hits) => hits,
            Err(SimilarityError::EmptyIndex) => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        let candidates = hits.len();
        let results: Vec<SimilarityResult> = hits
            .into_iter()
            .map(|(ticket, distance)| SimilarityResult {
                ticket: ticket.clone(),
                score: score_from_distance(distance),
            })
            .filter(|result| result.score >= self.config.threshold)
            .collect();

        debug!(
            candidates,
            matches = results.len(),
            threshold = self.config.threshold,
            "Similarity search completed"
        );

        Ok(results)
    }

    /// True iff the published snapshot holds at least one ticket.
    pub fn has_historical_data(&self) -> bool {
        !self.index.snapshot().is_empty()
    }

    /// True iff the top result clears the duplicate threshold. Results are
    /// already ordered by descending score, so only the first entry matters.
    pub fn is_duplicate(&self, results: &[SimilarityResult]) -> bool {
        results
            .first()
            .map(|top| top.score >= self.config.duplicate_threshold)
            .unwrap_or(false)
    }
}
