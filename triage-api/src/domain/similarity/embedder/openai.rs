//! OpenAI embedder implementation over the embeddings endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OpenAiSettings;
use crate::domain::similarity::traits::{Embedder, Result, SimilarityError};

/// Embedding dimensions for `text-embedding-3-small`.
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Embedder backed by the OpenAI embeddings API.
///
/// Tickets are small enough to embed whole, so a single input never gets
/// split across multiple vectors.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(settings: &OpenAiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SimilarityError::EmbeddingError(e.to_string()))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.embedding_model.clone(),
        })
    }

    async fn request_embeddings(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": inputs,
        });

        let response = self
            .http
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SimilarityError::EmbeddingError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(SimilarityError::EmbeddingError(format!(
                "embeddings request failed ({}): {}",
                status, message
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| SimilarityError::EmbeddingError(e.to_string()))?;

        if parsed.data.len() != inputs.len() {
            return Err(SimilarityError::EmbeddingError(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                parsed.data.len()
            )));
        }

        // The API reports an index per vector; order by it so outputs line
        // up with inputs.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIMENSIONS]);
        }

        let mut vectors = self.request_embeddings(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| SimilarityError::EmbeddingError("No embedding in response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Empty strings are rejected by the API; keep their slots as zero
        // vectors and batch only the rest.
        let mut results = vec![vec![0.0f32; EMBEDDING_DIMENSIONS]; texts.len()];
        let non_empty: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_empty())
            .map(|(i, t)| (i, *t))
            .collect();

        if non_empty.is_empty() {
            return Ok(results);
        }

        let batch: Vec<&str> = non_empty.iter().map(|(_, t)| *t).collect();
        let vectors = self.request_embeddings(&batch).await?;

        for ((original_idx, _), vector) in non_empty.iter().zip(vectors) {
            results[*original_idx] = vector;
        }

        Ok(results)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_response_orders_by_index() {
        let parsed: EmbeddingResponse = serde_json::from_value(serde_json::json!({
            "data": [
                { "index": 1, "embedding": [2.0] },
                { "index": 0, "embedding": [1.0] }
            ]
        }))
        .unwrap();

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        assert_eq!(data[0].embedding, vec![1.0]);
        assert_eq!(data[1].embedding, vec![2.0]);
    }
}
