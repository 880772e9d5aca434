use std::path::PathBuf;
use thiserror::Error;

/// Main error type for PoseSeek
#[derive(Error, Debug)]
pub enum PoseSeekError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Request rejected at the boundary before reaching the search core
    #[error("Invalid search request: {0}")]
    InvalidRequest(String),

    /// Vector index could not be loaded or written
    #[error("Index error: {0}")]
    Index(#[from] crate::index::VectorIndexError),

    /// Embedding collaborator could not be constructed or failed outside a search
    #[error("Embedding error: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),

    /// Reranker could not be constructed
    #[error("Reranker error: {0}")]
    Rerank(#[from] crate::rerank::RerankError),

    /// Catalogue (metadata store) errors
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] crate::catalogue::CatalogueError),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// How a collaborator fault is classified before the search core recovers from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Index or embedder not ready; reported once per call
    Unavailable,
    /// A single embedding or reranking call failed or timed out
    Transient,
    /// Collaborator answered, but the answer did not validate
    Malformed,
}

/// Result type for PoseSeek operations
pub type Result<T> = std::result::Result<T, PoseSeekError>;
