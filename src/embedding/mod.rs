//! Query embedding
//!
//! The search core only depends on the [`Embedder`] trait. Two backends:
//! - [`FastEmbedProvider`] runs a local ONNX model (all-MiniLM-L6-v2, 384-dim)
//! - [`RemoteEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint

mod provider;
mod remote;

pub use provider::{Embedder, EmbeddingError, FastEmbedProvider};
pub use remote::RemoteEmbedder;

use crate::config::EmbeddingConfig;
use std::sync::Arc;
use std::time::Duration;

/// Construct the configured embedder
///
/// `dimension` is the index dimension; remote models cannot report theirs
/// before the first call, so it is taken on trust and checked per response.
pub fn build_embedder(
    config: &EmbeddingConfig,
    dimension: usize,
) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "fastembed" => {
            let provider = FastEmbedProvider::new(&config.model)?;
            if provider.dimension() != dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: provider.dimension(),
                });
            }
            Ok(Arc::new(provider))
        }
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).ok();
            if api_key.is_none() {
                tracing::warn!(
                    "{} is not set; embedding requests will be sent without credentials",
                    config.api_key_env
                );
            }
            let embedder = RemoteEmbedder::new(
                config.base_url.clone(),
                api_key,
                config.model.clone(),
                dimension,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(embedder))
        }
        other => Err(EmbeddingError::InitializationError(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}
