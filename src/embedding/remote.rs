//! OpenAI-compatible embeddings endpoint

use super::{Embedder, EmbeddingError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedder backed by a remote `/embeddings` API (e.g. text-embedding-3-small)
pub struct RemoteEmbedder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model_name: String,
    dimension: usize,
    timeout: Duration,
}

impl RemoteEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model_name: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model_name: model_name.into(),
            dimension,
            timeout,
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model_name,
            input: texts,
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout(self.timeout.as_millis() as u64)
            } else {
                EmbeddingError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Request(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        assemble(parsed, texts.len(), self.dimension)
    }
}

/// Order embeddings by their `index` and check count and dimension
fn assemble(
    mut parsed: EmbeddingResponse,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if parsed.data.len() != expected {
        return Err(EmbeddingError::MalformedResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            parsed.data.len()
        )));
    }

    parsed.data.sort_by_key(|d| d.index);

    parsed
        .data
        .into_iter()
        .map(|d| {
            if d.embedding.len() != dimension {
                Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: d.embedding.len(),
                })
            } else {
                Ok(d.embedding)
            }
        })
        .collect()
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::GenerationError("No embeddings generated".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> EmbeddingResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_assemble_reorders_by_index() {
        let parsed = response(
            r#"{"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]}"#,
        );
        let vectors = assemble(parsed, 2, 2).unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_assemble_rejects_wrong_dimension() {
        let parsed = response(r#"{"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]}"#);
        assert!(matches!(
            assemble(parsed, 1, 2),
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_assemble_rejects_missing_rows() {
        let parsed = response(r#"{"data": []}"#);
        assert!(matches!(
            assemble(parsed, 1, 2),
            Err(EmbeddingError::MalformedResponse(_))
        ));
    }
}
