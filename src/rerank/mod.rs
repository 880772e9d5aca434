//! Semantic reranking of recalled candidates
//!
//! The search core calls [`Reranker::rerank`] with the stage-1 candidates and
//! falls back to recall order on any error. Backends:
//! - [`LlmReranker`] asks a chat-completion model for a JSON verdict
//! - [`CrossEncoderReranker`] scores query/text pairs with a local FastEmbed model

mod cross_encoder;
mod llm;

pub use cross_encoder::CrossEncoderReranker;
pub use llm::{parse_rerank_payload, LlmReranker};

use crate::config::RerankerConfig;
use crate::error::FailureKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RerankError {
    #[error("Reranker initialization failed: {0}")]
    InitializationError(String),

    #[error("Reranking failed: {0}")]
    RerankingError(String),

    #[error("Reranker call timed out after {0} ms")]
    Timeout(u64),

    #[error("Reranker output malformed: {0}")]
    Malformed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RerankError {
    /// Classify the fault; every kind is recovered by falling back to recall order
    pub fn kind(&self) -> FailureKind {
        match self {
            RerankError::InitializationError(_) => FailureKind::Unavailable,
            RerankError::Malformed(_) => FailureKind::Malformed,
            _ => FailureKind::Transient,
        }
    }
}

/// Reranker input: a recalled candidate with its prior similarity and text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankCandidate {
    pub entity_id: i64,
    pub prior_score: f32,
    pub text: String,
}

/// Reranker verdict for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedItem {
    pub entity_id: i64,
    /// Relevance in [0, 1]
    pub score: f32,
    /// Human-readable justification, not used for ranking
    #[serde(default)]
    pub reason: Option<String>,
}

/// Reorders, rescores and possibly drops candidates
///
/// Output may be any subset of the input IDs; it must not invent IDs.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        desired: usize,
    ) -> Result<Vec<RerankedItem>, RerankError>;

    fn model_name(&self) -> &str;
}

/// Construct the configured reranker, or `None` when reranking is disabled
pub fn build_reranker(config: &RerankerConfig) -> Result<Option<Arc<dyn Reranker>>, RerankError> {
    if !config.enabled {
        return Ok(None);
    }

    match config.provider.as_str() {
        "llm" => {
            let api_key = std::env::var(&config.api_key_env).ok();
            let reranker = LlmReranker::new(
                config.base_url.clone(),
                api_key,
                config.model.clone(),
                Duration::from_secs(config.timeout_secs),
            )?
            .with_sampling(config.temperature, config.max_tokens)
            .with_prompt_limits(config.acceptance_floor, config.snippet_chars);
            Ok(Some(Arc::new(reranker)))
        }
        "cross-encoder" => Ok(Some(Arc::new(CrossEncoderReranker::new(&config.model)?))),
        other => Err(RerankError::InitializationError(format!(
            "Unknown reranker provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_reranker_is_none() {
        let config = RerankerConfig {
            enabled: false,
            ..RerankerConfig::default()
        };
        assert!(build_reranker(&config).unwrap().is_none());
    }

    #[test]
    fn test_unknown_provider() {
        let config = RerankerConfig {
            enabled: true,
            provider: "oracle".to_string(),
            ..RerankerConfig::default()
        };
        assert!(matches!(
            build_reranker(&config),
            Err(RerankError::InitializationError(_))
        ));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RerankError::Timeout(5).kind(), FailureKind::Transient);
        assert_eq!(
            RerankError::Malformed("x".into()).kind(),
            FailureKind::Malformed
        );
    }
}
