//! Position → catalogue entity ID translation

use super::VectorIndexError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// On-disk ID map: either a JSON array (position i → `ids[i]`) or an object
/// keyed by stringified position (`{"0": 17}`)
#[derive(Deserialize)]
#[serde(untagged)]
enum IdMapFile {
    List(Vec<i64>),
    Keyed(HashMap<String, i64>),
}

/// Largest keyed-form span accepted when no index size is known
pub const MAX_POSITIONS: usize = 1 << 24;

/// Dense position table; `None` marks a position with no catalogue entry
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    slots: Vec<Option<i64>>,
}

impl IdMap {
    pub fn from_ids(ids: Vec<i64>) -> Self {
        Self {
            slots: ids.into_iter().map(Some).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, VectorIndexError> {
        Self::load_within(path, MAX_POSITIONS)
    }

    /// Load a map whose keyed positions must fall below `limit`
    pub fn load_within(path: &Path, limit: usize) -> Result<Self, VectorIndexError> {
        if !path.exists() {
            return Err(VectorIndexError::IndexNotFound(format!(
                "ID map {:?} does not exist; run `poseseek build-index` first",
                path
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse_within(&content, limit)
    }

    pub fn parse(content: &str) -> Result<Self, VectorIndexError> {
        Self::parse_within(content, MAX_POSITIONS)
    }

    /// Parse either form; keyed positions at or above `limit` are rejected
    pub fn parse_within(content: &str, limit: usize) -> Result<Self, VectorIndexError> {
        let file: IdMapFile = serde_json::from_str(content)
            .map_err(|e| VectorIndexError::SerializationError(format!("ID map: {}", e)))?;

        match file {
            IdMapFile::List(ids) => Ok(Self::from_ids(ids)),
            IdMapFile::Keyed(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, id) in entries {
                    let position: usize = key.parse().map_err(|_| {
                        VectorIndexError::SerializationError(format!(
                            "ID map key '{}' is not a position",
                            key
                        ))
                    })?;
                    if position >= limit {
                        return Err(VectorIndexError::SerializationError(format!(
                            "ID map position {} is out of range (limit {})",
                            position, limit
                        )));
                    }
                    pairs.push((position, id));
                }

                let size = pairs
                    .iter()
                    .filter_map(|(p, _)| p.checked_add(1))
                    .max()
                    .unwrap_or(0);
                let mut slots = vec![None; size];
                for (position, id) in pairs {
                    slots[position] = Some(id);
                }
                Ok(Self { slots })
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), VectorIndexError> {
        // Gaps cannot be expressed in the list form
        let ids: Option<Vec<i64>> = self.slots.iter().copied().collect();
        let json = match ids {
            Some(ids) => serde_json::to_string(&ids),
            None => {
                let keyed: HashMap<String, i64> = self
                    .slots
                    .iter()
                    .enumerate()
                    .filter_map(|(p, id)| id.map(|id| (p.to_string(), id)))
                    .collect();
                serde_json::to_string(&keyed)
            }
        }
        .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Entity ID at `position`; negative and unmapped positions yield `None`
    pub fn get(&self, position: i64) -> Option<i64> {
        if position < 0 {
            return None;
        }
        self.slots.get(position as usize).copied().flatten()
    }

    /// Number of positions covered
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
