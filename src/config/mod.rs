//! Configuration management for PoseSeek
//!
//! Loads the TOML config, applies a named profile and `POSESEEK_*` environment
//! overrides, then validates every section.

use crate::error::{PoseSeekError, Result};
use crate::search::SimilarityPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub reranker: RerankerConfig,
    pub retrieval: RetrievalConfig,
    pub catalogue: CatalogueConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: "1.0.0".to_string(),
            created_at: current_timestamp(),
            last_modified: current_timestamp(),
        }
    }
}

/// Nearest-neighbor backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Exact squared-L2 scan
    Flat,
    /// Approximate HNSW graph
    Hnsw,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub index_path: PathBuf,
    pub id_map_path: PathBuf,
    pub backend: IndexBackend,
    /// Vector dimension (must match embedding dimension)
    pub vector_dim: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.poseseek");
        Self {
            index_path: data_dir.join("vector_index").join("index.json"),
            id_map_path: data_dir.join("vector_index").join("id_map.json"),
            backend: IndexBackend::Flat,
            vector_dim: 384,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 64,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: String, // "fastembed" or "openai"
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    /// Upper bound on one embedding call
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Reranker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    pub enabled: bool,
    pub provider: String, // "llm" or "cross-encoder"
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    /// Upper bound on one reranking call
    pub timeout_secs: u64,
    /// Verdicts at or below this score are dropped
    pub acceptance_floor: f32,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Characters of description sent per candidate
    pub snippet_chars: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "llm".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 20,
            acceptance_floor: 0.6,
            temperature: 0.1,
            max_tokens: 1000,
            snippet_chars: 200,
        }
    }
}

/// Retrieval tuning: similarity policy, adaptive thresholds and pool sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub similarity_policy: SimilarityPolicy,
    pub default_min_similarity: f32,
    /// Multi-stage floor = max(min_similarity, average × factor)
    pub quality_floor_factor: f32,
    pub stage1_multiplier: usize,
    pub stage1_cap: usize,
    pub dynamic_pool_multiplier: usize,
    pub dynamic_pool_cap: usize,
    /// Optional floor applied to the strict tier of multi-tier search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_min_similarity: Option<f32>,
    pub adaptive_min_similarity: f32,
    pub loose_min_similarity: f32,
    pub loose_pool_multiplier: usize,
    pub loose_pool_cap: usize,
    pub pagination_headroom: usize,
    pub pagination_pool_cap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_policy: SimilarityPolicy::Linear,
            default_min_similarity: 0.3,
            quality_floor_factor: 0.8,
            stage1_multiplier: 5,
            stage1_cap: 100,
            dynamic_pool_multiplier: 10,
            dynamic_pool_cap: 500,
            strict_min_similarity: None,
            adaptive_min_similarity: 0.2,
            loose_min_similarity: 0.1,
            loose_pool_multiplier: 20,
            loose_pool_cap: 1000,
            pagination_headroom: 5,
            pagination_pool_cap: 1000,
        }
    }
}

/// Catalogue (metadata store) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueConfig {
    pub database_path: PathBuf,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("~/.poseseek").join("catalogue.db"),
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_policy: Option<SimilarityPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranker_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_backend: Option<IndexBackend>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PoseSeekError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PoseSeekError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PoseSeekError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| PoseSeekError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    ///
    /// Profile first, then environment, so env vars win.
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_profile(profile)?;
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self.profiles.get(profile).cloned().ok_or_else(|| {
            PoseSeekError::Config(format!("Unknown profile: {}", profile))
        })?;

        if let Some(policy) = overrides.similarity_policy {
            self.retrieval.similarity_policy = policy;
        }
        if let Some(enabled) = overrides.reranker_enabled {
            self.reranker.enabled = enabled;
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(backend) = overrides.index_backend {
            self.index.backend = backend;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: POSESEEK_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("POSESEEK_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "RERANKER__ENABLED" => {
                self.reranker.enabled = parse_env(path, value)?;
            }
            "RERANKER__MODEL" => {
                self.reranker.model = value.to_string();
            }
            "RERANKER__TIMEOUT_SECS" => {
                self.reranker.timeout_secs = parse_env(path, value)?;
            }
            "EMBEDDING__PROVIDER" => {
                self.embedding.provider = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "EMBEDDING__TIMEOUT_SECS" => {
                self.embedding.timeout_secs = parse_env(path, value)?;
            }
            "INDEX__INDEX_PATH" => {
                self.index.index_path = PathBuf::from(value);
            }
            "INDEX__ID_MAP_PATH" => {
                self.index.id_map_path = PathBuf::from(value);
            }
            "RETRIEVAL__SIMILARITY_POLICY" => {
                self.retrieval.similarity_policy =
                    value.parse().map_err(|e: String| PoseSeekError::InvalidConfigValue {
                        path: path.to_string(),
                        message: e,
                    })?;
            }
            "RETRIEVAL__DEFAULT_MIN_SIMILARITY" => {
                self.retrieval.default_min_similarity = parse_env(path, value)?;
            }
            "CATALOGUE__DATABASE_PATH" => {
                self.catalogue.database_path = PathBuf::from(value);
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| PoseSeekError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("poseseek").join("config.toml"))
    }

    /// Expand `~` in every configured file path
    pub fn resolve_paths(&mut self) -> Result<()> {
        self.index.index_path = expand_path(&self.index.index_path)?;
        self.index.id_map_path = expand_path(&self.index.id_map_path)?;
        self.catalogue.database_path = expand_path(&self.catalogue.database_path)?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| PoseSeekError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or_else(|| {
                PoseSeekError::Config("Cannot determine home directory".to_string())
            })?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_through_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        Config::default().save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.index.backend, IndexBackend::Flat);
        assert_eq!(loaded.retrieval.similarity_policy, SimilarityPolicy::Linear);
        assert_eq!(loaded.reranker.acceptance_floor, 0.6);
    }

    #[test]
    fn test_apply_profile() {
        let mut config = Config::default();
        config.profiles.insert(
            "precise".to_string(),
            ProfileOverrides {
                similarity_policy: Some(SimilarityPolicy::Exponential),
                reranker_enabled: Some(true),
                index_backend: Some(IndexBackend::Hnsw),
                ..ProfileOverrides::default()
            },
        );

        config.apply_profile("precise").unwrap();
        assert_eq!(
            config.retrieval.similarity_policy,
            SimilarityPolicy::Exponential
        );
        assert!(config.reranker.enabled);
        assert_eq!(config.index.backend, IndexBackend::Hnsw);

        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn test_env_value_parsing() {
        let mut config = Config::default();
        config
            .set_value_from_env("RETRIEVAL__SIMILARITY_POLICY", "half-exponential")
            .unwrap();
        assert_eq!(
            config.retrieval.similarity_policy,
            SimilarityPolicy::HalfExponential
        );

        config
            .set_value_from_env("EMBEDDING__TIMEOUT_SECS", "3")
            .unwrap();
        assert_eq!(config.embedding.timeout_secs, 3);

        assert!(config
            .set_value_from_env("RERANKER__ENABLED", "maybe")
            .is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(&temp.path().join("absent.toml")),
            Err(PoseSeekError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_expand_path() {
        let plain = expand_path(Path::new("/tmp/index.json")).unwrap();
        assert_eq!(plain, PathBuf::from("/tmp/index.json"));

        let expanded = expand_path(Path::new("~/.poseseek/index.json")).unwrap();
        assert!(!expanded.starts_with("~"));
        assert!(expanded.ends_with(".poseseek/index.json"));
    }
}
