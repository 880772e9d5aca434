//! Vectors persisted by `build-index` and loaded once at startup

use super::VectorIndexError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Row-major catalogue vectors; row i is index position i
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub dimension: usize,
    pub vectors: Vec<Vec<f32>>,
    /// Embedding model the vectors were produced with
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub built_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl IndexSnapshot {
    pub fn new(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self, VectorIndexError> {
        let snapshot = Self {
            dimension,
            vectors,
            model: None,
            built_at: None,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self.built_at = Some(chrono::Utc::now());
        self
    }

    pub fn load(path: &Path) -> Result<Self, VectorIndexError> {
        if !path.exists() {
            return Err(VectorIndexError::IndexNotFound(format!(
                "Index snapshot {:?} does not exist; run `poseseek build-index` first",
                path
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&content)
            .map_err(|e| VectorIndexError::SerializationError(format!("{:?}: {}", path, e)))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), VectorIndexError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)
            .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), VectorIndexError> {
        if self.dimension == 0 {
            return Err(VectorIndexError::InitializationError(
                "Snapshot dimension must be greater than 0".to_string(),
            ));
        }
        if let Some(bad) = self.vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vectors/index.json");

        let snapshot = IndexSnapshot::new(3, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]])
            .unwrap()
            .with_model("all-MiniLM-L6-v2");
        snapshot.save(&path).unwrap();

        let loaded = IndexSnapshot::load(&path).unwrap();
        assert_eq!(loaded.dimension, 3);
        assert_eq!(loaded.vectors.len(), 2);
        assert_eq!(loaded.model.as_deref(), Some("all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_rejects_ragged_vectors() {
        assert!(matches!(
            IndexSnapshot::new(3, vec![vec![1.0, 0.0]]),
            Err(VectorIndexError::InvalidDimension {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_missing_snapshot() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            IndexSnapshot::load(&temp.path().join("none.json")),
            Err(VectorIndexError::IndexNotFound(_))
        ));
    }
}
