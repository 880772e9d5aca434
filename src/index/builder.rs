/// Catalogue → vector index snapshot + ID map
use super::{IdMap, IndexSnapshot};
use crate::catalogue::CatalogueEntry;
use crate::embedding::{Embedder, EmbeddingError};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Outcome of an index build
#[derive(Debug)]
pub struct BuildReport {
    pub snapshot: IndexSnapshot,
    pub id_map: IdMap,
    /// Entries with no text to embed
    pub skipped: Vec<i64>,
    pub duration_ms: u64,
}

impl BuildReport {
    pub fn indexed(&self) -> usize {
        self.id_map.len()
    }

    /// Write snapshot and ID map side by side
    pub fn save(&self, index_path: &Path, id_map_path: &Path) -> Result<()> {
        self.snapshot.save(index_path)?;
        self.id_map.save(id_map_path)?;
        info!(
            "Wrote {} vectors to {:?} and ID map to {:?}",
            self.indexed(),
            index_path,
            id_map_path
        );
        Ok(())
    }
}

/// Embeds catalogue entries in batches; position i of the snapshot maps to
/// the i-th indexed entry's ID.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn build(&self, entries: &[CatalogueEntry]) -> Result<BuildReport> {
        let start = std::time::Instant::now();
        info!("Embedding {} catalogue entries", entries.len());

        let mut skipped = Vec::new();
        let mut items: Vec<(i64, String)> = Vec::with_capacity(entries.len());
        for entry in entries {
            let text = entry.combined_text();
            if text.trim().is_empty() {
                warn!("Catalogue entry {} has no text, skipping", entry.id);
                skipped.push(entry.id);
            } else {
                items.push((entry.id, text));
            }
        }

        let mut ids = Vec::with_capacity(items.len());
        let mut vectors = Vec::with_capacity(items.len());

        for chunk in items.chunks(self.batch_size) {
            let texts: Vec<String> = chunk.iter().map(|(_, text)| text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != chunk.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "Embedding count mismatch: expected {}, got {}",
                    chunk.len(),
                    embeddings.len()
                ))
                .into());
            }

            ids.extend(chunk.iter().map(|(id, _)| *id));
            vectors.extend(embeddings);
            debug!("Embedded chunk of {} entries", chunk.len());
        }

        let snapshot = IndexSnapshot::new(self.embedder.dimension(), vectors)?
            .with_model(self.embedder.model_name());
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Index build complete: {} indexed, {} skipped, {}ms",
            ids.len(),
            skipped.len(),
            duration_ms
        );

        Ok(BuildReport {
            snapshot,
            id_map: IdMap::from_ids(ids),
            skipped,
            duration_ms,
        })
    }
}
