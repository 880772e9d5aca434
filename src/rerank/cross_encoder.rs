//! Cross-encoder reranking using FastEmbed

use super::{RerankCandidate, RerankError, RerankedItem, Reranker};
use async_trait::async_trait;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::sync::Arc;

/// Local cross-encoder reranker
///
/// Raw model logits are squashed with a sigmoid so scores share the [0, 1]
/// range the acceptance floor is calibrated for.
pub struct CrossEncoderReranker {
    model: Arc<TextRerank>,
    model_name: String,
}

impl CrossEncoderReranker {
    /// Create a new reranker with specified model
    ///
    /// # Arguments
    /// * `model_name` - One of "bge-reranker-base", "bge-reranker-v2-m3", "jina-reranker-v1-turbo-en"
    pub fn new(model_name: &str) -> Result<Self, RerankError> {
        let model = match model_name {
            "bge-reranker-base" => RerankerModel::BGERerankerBase,
            "bge-reranker-v2-m3" => RerankerModel::BGERerankerV2M3,
            "jina-reranker-v1-turbo-en" => RerankerModel::JINARerankerV1TurboEn,
            _ => {
                return Err(RerankError::InitializationError(format!(
                    "Unsupported cross-encoder: {}",
                    model_name
                )))
            }
        };

        tracing::info!("Initializing reranker model: {}", model_name);

        let init_options = RerankInitOptions::new(model).with_show_download_progress(true);
        let model = TextRerank::try_new(init_options)
            .map_err(|e| RerankError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
        })
    }

    /// Create reranker with default model
    pub fn with_default_model() -> Result<Self, RerankError> {
        Self::new("bge-reranker-base")
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        desired: usize,
    ) -> Result<Vec<RerankedItem>, RerankError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        if query.trim().is_empty() {
            return Err(RerankError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let documents: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();

        let results =
            tokio::task::spawn_blocking(move || model.rerank(query, documents, false, None))
                .await
                .map_err(|e| RerankError::RerankingError(e.to_string()))?
                .map_err(|e| RerankError::RerankingError(e.to_string()))?;

        let mut scored = Vec::with_capacity(results.len());
        for result in results {
            let candidate = candidates.get(result.index).ok_or_else(|| {
                RerankError::Malformed(format!("result index {} out of range", result.index))
            })?;
            scored.push(RerankedItem {
                entity_id: candidate.entity_id,
                score: sigmoid(result.score),
                reason: None,
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(desired);

        Ok(scored)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_bounds() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_unsupported_model() {
        assert!(CrossEncoderReranker::new("no-such-model").is_err());
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_rerank_basic() {
        let reranker = CrossEncoderReranker::with_default_model().unwrap();
        let candidates = vec![
            RerankCandidate {
                entity_id: 1,
                prior_score: 0.5,
                text: "Woman seated at a cafe table holding a cup".to_string(),
            },
            RerankCandidate {
                entity_id: 2,
                prior_score: 0.5,
                text: "Mountain landscape at sunrise".to_string(),
            },
        ];

        let results = reranker
            .rerank("sitting in a coffee shop", &candidates, 2)
            .await
            .unwrap();
        assert_eq!(results[0].entity_id, 1);
    }
}
