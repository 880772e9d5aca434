use crate::config::Config;
use crate::error::{PoseSeekError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_reranker(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PoseSeekError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.index.vector_dim == 0 {
            errors.push(ValidationError::new(
                "index.vector_dim",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.index.index_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "index.index_path",
                "Index path cannot be empty",
            ));
        }

        if config.index.id_map_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "index.id_map_path",
                "ID map path cannot be empty",
            ));
        }

        if config.index.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.index.hnsw_ef_construction == 0 || config.index.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_construction",
                "HNSW ef parameters must be greater than 0",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        if provider != "fastembed" && provider != "openai" {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!(
                    "Provider must be 'fastembed' or 'openai', got '{}'",
                    provider
                ),
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        // Network-bound calls must never be unbounded
        if config.embedding.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "embedding.timeout_secs",
                "Embedding timeout must be greater than 0",
            ));
        }
    }

    fn validate_reranker(config: &Config, errors: &mut Vec<ValidationError>) {
        let reranker = &config.reranker;

        let valid_providers = ["llm", "cross-encoder"];
        if !valid_providers.contains(&reranker.provider.as_str()) {
            errors.push(ValidationError::new(
                "reranker.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, reranker.provider
                ),
            ));
        }

        if reranker.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "reranker.timeout_secs",
                "Reranker timeout must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&reranker.acceptance_floor) {
            errors.push(ValidationError::new(
                "reranker.acceptance_floor",
                format!(
                    "Acceptance floor must be between 0.0 and 1.0, got {}",
                    reranker.acceptance_floor
                ),
            ));
        }

        if !(0.0..=2.0).contains(&reranker.temperature) {
            errors.push(ValidationError::new(
                "reranker.temperature",
                format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    reranker.temperature
                ),
            ));
        }

        // Only the remote reranker needs credentials
        if reranker.enabled && reranker.provider == "llm" {
            match std::env::var(&reranker.api_key_env) {
                Ok(key) if key.is_empty() => errors.push(ValidationError::new(
                    "reranker.api_key_env",
                    format!("Environment variable {} is empty", reranker.api_key_env),
                )),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::new(
                    "reranker.api_key_env",
                    format!("Environment variable {} is not set", reranker.api_key_env),
                )),
            }
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        let similarities = [
            ("retrieval.default_min_similarity", retrieval.default_min_similarity),
            ("retrieval.adaptive_min_similarity", retrieval.adaptive_min_similarity),
            ("retrieval.loose_min_similarity", retrieval.loose_min_similarity),
        ];
        for (path, value) in similarities {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ValidationError::new(
                    path,
                    format!("Similarity must be between 0.0 and 1.0, got {}", value),
                ));
            }
        }

        if let Some(strict) = retrieval.strict_min_similarity {
            if !(0.0..=1.0).contains(&strict) {
                errors.push(ValidationError::new(
                    "retrieval.strict_min_similarity",
                    format!("Similarity must be between 0.0 and 1.0, got {}", strict),
                ));
            }
        }

        if retrieval.loose_min_similarity > retrieval.adaptive_min_similarity {
            errors.push(ValidationError::new(
                "retrieval.loose_min_similarity",
                "Loose tier floor must not exceed the adaptive tier floor",
            ));
        }

        if !(0.0..=1.0).contains(&retrieval.quality_floor_factor) {
            errors.push(ValidationError::new(
                "retrieval.quality_floor_factor",
                format!(
                    "Quality floor factor must be between 0.0 and 1.0, got {}",
                    retrieval.quality_floor_factor
                ),
            ));
        }

        let sizes = [
            ("retrieval.stage1_multiplier", retrieval.stage1_multiplier),
            ("retrieval.stage1_cap", retrieval.stage1_cap),
            ("retrieval.dynamic_pool_multiplier", retrieval.dynamic_pool_multiplier),
            ("retrieval.dynamic_pool_cap", retrieval.dynamic_pool_cap),
            ("retrieval.loose_pool_multiplier", retrieval.loose_pool_multiplier),
            ("retrieval.loose_pool_cap", retrieval.loose_pool_cap),
            ("retrieval.pagination_headroom", retrieval.pagination_headroom),
            ("retrieval.pagination_pool_cap", retrieval.pagination_pool_cap),
        ];
        for (path, value) in sizes {
            if value == 0 {
                errors.push(ValidationError::new(path, "Must be greater than 0"));
            }
        }
    }
}
