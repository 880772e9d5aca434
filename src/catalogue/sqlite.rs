//! SQLite catalogue mirror
//!
//! Read-mostly view of the pose catalogue: poses, tags and their join table.

use super::{CatalogueEntry, CatalogueError, DescriptionStore};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS poses (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        scene_category TEXT,
        angle TEXT,
        status TEXT NOT NULL DEFAULT 'active'
    );
    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS pose_tags (
        pose_id INTEGER NOT NULL REFERENCES poses(id),
        tag_id INTEGER NOT NULL REFERENCES tags(id),
        PRIMARY KEY (pose_id, tag_id)
    );
";

/// ASCII unit separator, `char(31)` in `ENTRY_SELECT`
const TAG_SEPARATOR: char = '\u{1f}';

const ENTRY_SELECT: &str = "
    SELECT p.id, p.title, p.description, GROUP_CONCAT(t.name, char(31))
    FROM poses p
    LEFT JOIN pose_tags pt ON p.id = pt.pose_id
    LEFT JOIN tags t ON pt.tag_id = t.id
";

/// Catalogue backed by a pooled SQLite database
pub struct SqliteCatalogue {
    pool: DbPool,
}

impl SqliteCatalogue {
    /// Open (and create if missing) the catalogue database
    pub fn open(db_path: &Path) -> Result<Self, CatalogueError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| CatalogueError::Pool(e.to_string()))?;

        let catalogue = Self { pool };
        {
            let conn = catalogue.get_conn()?;
            conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
            conn.execute_batch(SCHEMA)?;
        }

        Ok(catalogue)
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, CatalogueError> {
        self.pool
            .get()
            .map_err(|e| CatalogueError::Pool(e.to_string()))
    }

    /// Insert or replace a pose and its tags
    pub fn upsert(&self, entry: &CatalogueEntry) -> Result<(), CatalogueError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO poses (id, title, description, status) VALUES (?1, ?2, ?3, 'active')",
            params![entry.id, entry.title, entry.description],
        )?;
        tx.execute("DELETE FROM pose_tags WHERE pose_id = ?1", params![entry.id])?;

        for tag in &entry.tags {
            tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![tag])?;
            let tag_id: i64 =
                tx.query_row("SELECT id FROM tags WHERE name = ?1", params![tag], |row| {
                    row.get(0)
                })?;
            tx.execute(
                "INSERT OR IGNORE INTO pose_tags (pose_id, tag_id) VALUES (?1, ?2)",
                params![entry.id, tag_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Every active pose, ordered by ID
    pub fn active_entries(&self) -> Result<Vec<CatalogueEntry>, CatalogueError> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE p.status = 'active' GROUP BY p.id ORDER BY p.id",
            ENTRY_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn entry(&self, entity_id: i64) -> Result<Option<CatalogueEntry>, CatalogueError> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE p.id = ?1 GROUP BY p.id", ENTRY_SELECT);
        let entry = conn
            .query_row(&sql, params![entity_id], row_to_entry)
            .optional()?;
        Ok(entry)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogueEntry> {
    let tags: Option<String> = row.get(3)?;
    Ok(CatalogueEntry {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        tags: tags
            .map(|t| t.split(TAG_SEPARATOR).map(str::to_string).collect())
            .unwrap_or_default(),
    })
}

impl DescriptionStore for SqliteCatalogue {
    fn description(&self, entity_id: i64) -> Result<Option<String>, CatalogueError> {
        Ok(self.entry(entity_id)?.map(|e| e.combined_text()))
    }

    fn title(&self, entity_id: i64) -> Result<Option<String>, CatalogueError> {
        let conn = self.get_conn()?;
        let title = conn
            .query_row(
                "SELECT title FROM poses WHERE id = ?1",
                params![entity_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: i64, title: &str, tags: &[&str]) -> CatalogueEntry {
        CatalogueEntry {
            id,
            title: title.to_string(),
            description: Some(format!("{} description", title)),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_upsert_and_read_back() {
        let temp = TempDir::new().unwrap();
        let catalogue = SqliteCatalogue::open(&temp.path().join("catalogue.db")).unwrap();

        catalogue.upsert(&entry(1, "Cafe window", &["indoor"])).unwrap();
        catalogue.upsert(&entry(2, "Street crossing", &[])).unwrap();

        let entries = catalogue.active_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].tags, vec!["indoor".to_string()]);
        assert!(entries[1].tags.is_empty());

        assert_eq!(
            catalogue.description(1).unwrap().as_deref(),
            Some("Cafe window Cafe window description indoor")
        );
        assert_eq!(catalogue.title(2).unwrap().as_deref(), Some("Street crossing"));
        assert_eq!(catalogue.description(99).unwrap(), None);
    }

    #[test]
    fn test_multi_word_tags_round_trip() {
        let temp = TempDir::new().unwrap();
        let catalogue = SqliteCatalogue::open(&temp.path().join("catalogue.db")).unwrap();

        catalogue
            .upsert(&entry(3, "Rooftop", &["golden hour", "city skyline"]))
            .unwrap();

        let mut tags = catalogue.entry(3).unwrap().unwrap().tags;
        tags.sort();
        assert_eq!(tags, vec!["city skyline".to_string(), "golden hour".to_string()]);
    }

    #[test]
    fn test_inactive_entries_excluded() {
        let temp = TempDir::new().unwrap();
        let catalogue = SqliteCatalogue::open(&temp.path().join("catalogue.db")).unwrap();
        catalogue.upsert(&entry(1, "Archived", &[])).unwrap();

        catalogue
            .get_conn()
            .unwrap()
            .execute("UPDATE poses SET status = 'inactive' WHERE id = 1", [])
            .unwrap();

        assert!(catalogue.active_entries().unwrap().is_empty());
    }
}
