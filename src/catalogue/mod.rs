//! Catalogue metadata lookups
//!
//! The search core needs one thing from the catalogue: descriptive text for a
//! candidate, used to build reranker input. Titles are joined for display by
//! the CLI; `build-index` reads every active entry.

mod memory;
mod sqlite;

pub use memory::InMemoryCatalogue;
pub use sqlite::SqliteCatalogue;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One catalogue item as far as retrieval cares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CatalogueEntry {
    /// Title, description and tags joined with spaces; the text that gets embedded
    pub fn combined_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.title.trim().is_empty() {
            parts.push(self.title.trim());
        }
        if let Some(description) = &self.description {
            if !description.trim().is_empty() {
                parts.push(description.trim());
            }
        }
        parts.extend(self.tags.iter().map(|t| t.as_str()).filter(|t| !t.is_empty()));
        parts.join(" ")
    }
}

/// Metadata collaborator consumed by multi-stage search
pub trait DescriptionStore: Send + Sync {
    /// Descriptive text for an entity; `None` when the entity is unknown
    fn description(&self, entity_id: i64) -> Result<Option<String>, CatalogueError>;

    /// Display title for an entity
    fn title(&self, entity_id: i64) -> Result<Option<String>, CatalogueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_text_skips_blanks() {
        let entry = CatalogueEntry {
            id: 1,
            title: "Window seat".to_string(),
            description: Some("  ".to_string()),
            tags: vec!["cafe".to_string(), String::new(), "seated".to_string()],
        };
        assert_eq!(entry.combined_text(), "Window seat cafe seated");
    }
}
