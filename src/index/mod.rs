//! Read-only nearest-neighbor index over catalogue vectors
//!
//! Architecture:
//! - [`VectorIndex`] trait: `search(vector, k)` → (position, squared L2 distance), nearest first
//! - [`FlatIndex`] exact scan, pads with position -1 when `k` exceeds the index size
//! - [`HnswIndex`] approximate graph search via hnsw_rs
//! - [`IdMap`] translates dense positions to catalogue entity IDs
//! - [`IndexSnapshot`] on-disk vectors written by `build-index`
//! - [`IndexBuilder`] embeds catalogue entries into a snapshot + ID map

mod builder;
mod flat;
mod hnsw;
mod id_map;
mod snapshot;

pub use builder::{BuildReport, IndexBuilder, DEFAULT_BATCH_SIZE};
pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
pub use id_map::IdMap;
pub use snapshot::IndexSnapshot;

use crate::config::{IndexBackend, IndexConfig};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Position returned for an empty neighbor slot
pub const NO_NEIGHBOR: i64 = -1;

/// One raw hit from the index, before ID-map translation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    /// Dense internal position, or [`NO_NEIGHBOR`]
    pub position: i64,
    /// Squared Euclidean distance (non-negative)
    pub distance: f32,
}

/// Approximate (or exact) k-nearest-neighbor search
///
/// Implementations must be safe for concurrent read-only queries and must
/// return an empty list, not an error, when they hold zero vectors.
pub trait VectorIndex: Send + Sync {
    /// Up to `k` neighbors ordered by ascending distance
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError>;

    /// Number of indexed vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension fixed at build time
    fn dimension(&self) -> usize;

    /// Backend name for diagnostics
    fn backend(&self) -> &'static str;
}

/// Index plus its ID map, loaded once and shared read-only
pub struct IndexHandle {
    index: Box<dyn VectorIndex>,
    id_map: IdMap,
}

impl IndexHandle {
    pub fn new(index: Box<dyn VectorIndex>, id_map: IdMap) -> Self {
        if id_map.len() < index.len() {
            tracing::warn!(
                "ID map covers {} positions but index holds {} vectors; unmapped hits will be dropped",
                id_map.len(),
                index.len()
            );
        }
        Self { index, id_map }
    }

    /// Load snapshot + ID map from the configured paths and build the configured backend
    pub fn load(config: &IndexConfig) -> Result<Self, VectorIndexError> {
        let snapshot = IndexSnapshot::load(&config.index_path)?;
        if snapshot.dimension != config.vector_dim {
            return Err(VectorIndexError::InvalidDimension {
                expected: config.vector_dim,
                actual: snapshot.dimension,
            });
        }

        let id_map = IdMap::load_within(&config.id_map_path, snapshot.vectors.len())?;

        let index: Box<dyn VectorIndex> = match config.backend {
            IndexBackend::Flat => Box::new(FlatIndex::from_snapshot(snapshot)),
            IndexBackend::Hnsw => Box::new(HnswIndex::build(
                snapshot,
                config.hnsw_m,
                config.hnsw_ef_construction,
                config.hnsw_ef_search,
            )),
        };

        tracing::info!(
            "Vector index loaded: {} vectors ({}D, {}), {} mapped IDs",
            index.len(),
            index.dimension(),
            index.backend(),
            id_map.len()
        );

        Ok(Self::new(index, id_map))
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        self.index.search(query, k)
    }

    /// Entity ID for a position; `None` for -1 and unmapped positions
    pub fn entity_id(&self, position: i64) -> Option<i64> {
        self.id_map.get(position)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn backend(&self) -> &'static str {
        self.index.backend()
    }

    pub fn id_map(&self) -> &IdMap {
        &self.id_map
    }
}

/// Reject queries of the wrong width or with non-finite components
pub(crate) fn check_query(query: &[f32], dimension: usize) -> Result<(), VectorIndexError> {
    if query.len() != dimension {
        return Err(VectorIndexError::InvalidDimension {
            expected: dimension,
            actual: query.len(),
        });
    }
    if let Some(i) = query.iter().position(|x| !x.is_finite()) {
        return Err(VectorIndexError::SearchError(format!(
            "query component {} is not finite",
            i
        )));
    }
    Ok(())
}

/// Squared Euclidean distance
pub(crate) fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_check_query() {
        assert!(check_query(&[0.0, 1.0], 2).is_ok());
        assert!(matches!(
            check_query(&[0.0, f32::NAN], 2),
            Err(VectorIndexError::SearchError(_))
        ));
        assert!(matches!(
            check_query(&[0.0], 2),
            Err(VectorIndexError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_handle_drops_unmapped_positions() {
        let index = FlatIndex::new(2, vec![vec![0.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let handle = IndexHandle::new(Box::new(index), IdMap::from_ids(vec![42]));

        assert_eq!(handle.entity_id(0), Some(42));
        assert_eq!(handle.entity_id(1), None);
        assert_eq!(handle.entity_id(NO_NEIGHBOR), None);
    }
}
