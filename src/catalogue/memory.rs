use super::{CatalogueEntry, CatalogueError, DescriptionStore};
use std::collections::HashMap;
use std::path::Path;

/// Catalogue held in memory, loaded from a JSON array of entries or built in tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogue {
    entries: HashMap<i64, CatalogueEntry>,
}

impl InMemoryCatalogue {
    pub fn new(entries: impl IntoIterator<Item = CatalogueEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Load `[{"id": 1, "title": "...", "description": "...", "tags": [...]}, ...]`
    pub fn load_json(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::error::PoseSeekError::Io {
            source: e,
            context: format!("Failed to read catalogue file: {:?}", path),
        })?;
        let entries: Vec<CatalogueEntry> =
            serde_json::from_str(&content).map_err(|e| crate::error::PoseSeekError::Json {
                source: e,
                context: format!("Failed to parse catalogue file: {:?}", path),
            })?;
        Ok(Self::new(entries))
    }

    /// Entries ordered by ID
    pub fn entries(&self) -> Vec<CatalogueEntry> {
        let mut entries: Vec<CatalogueEntry> = self.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.id);
        entries
    }
}

impl DescriptionStore for InMemoryCatalogue {
    fn description(&self, entity_id: i64) -> Result<Option<String>, CatalogueError> {
        Ok(self.entries.get(&entity_id).map(|e| e.combined_text()))
    }

    fn title(&self, entity_id: i64) -> Result<Option<String>, CatalogueError> {
        Ok(self.entries.get(&entity_id).map(|e| e.title.clone()))
    }
}
