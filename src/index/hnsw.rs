/// HNSW vector index for approximate similarity search
use super::{check_query, IndexSnapshot, Neighbor, VectorIndex, VectorIndexError};
use hnsw_rs::prelude::*;

/// Maximum number of HNSW layers supported by hnsw_rs
const MAX_LAYERS: usize = 16;

/// HNSW index wrapper
///
/// Built once from a snapshot and never mutated afterwards. hnsw_rs reports
/// plain L2 distance; it is squared here so both backends share one unit and
/// thresholds stay calibrated.
pub struct HnswIndex {
    index: Hnsw<'static, f32, DistL2>,
    dimension: usize,
    count: usize,
    ef_search: usize,
}

impl HnswIndex {
    /// Build the graph from a snapshot
    ///
    /// # Arguments
    /// * `m` - HNSW M parameter (number of connections per layer)
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    /// * `ef_search` - HNSW search parameter (higher = better recall, slower search)
    pub fn build(
        snapshot: IndexSnapshot,
        m: usize,
        ef_construction: usize,
        ef_search: usize,
    ) -> Self {
        let count = snapshot.vectors.len();
        let index = Hnsw::<f32, DistL2>::new(
            m,
            count.max(1),
            MAX_LAYERS,
            ef_construction,
            DistL2 {},
        );

        for (position, vector) in snapshot.vectors.iter().enumerate() {
            index.insert((vector, position));
        }

        Self {
            index,
            dimension: snapshot.dimension,
            count,
            ef_search,
        }
    }
}

impl VectorIndex for HnswIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        check_query(query, self.dimension)?;

        if self.count == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .index
            .search(query, k, self.ef_search.max(k))
            .into_iter()
            .map(|n| Neighbor {
                position: n.d_id as i64,
                distance: n.distance * n.distance,
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }

    fn len(&self) -> usize {
        self.count
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend(&self) -> &'static str {
        "hnsw"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IndexSnapshot {
        let mut vectors = Vec::new();
        for i in 0..20 {
            let mut v = vec![0.0; 8];
            v[i % 8] = 1.0 + (i / 8) as f32;
            vectors.push(v);
        }
        IndexSnapshot::new(8, vectors).unwrap()
    }

    #[test]
    fn test_index_creation() {
        let index = HnswIndex::build(snapshot(), 16, 200, 64);
        assert_eq!(index.dimension(), 8);
        assert_eq!(index.len(), 20);
        assert_eq!(index.backend(), "hnsw");
    }

    #[test]
    fn test_search_finds_exact_match() {
        let index = HnswIndex::build(snapshot(), 16, 200, 64);
        let mut query = vec![0.0; 8];
        query[3] = 1.0;

        let results = index.search(&query, 3).unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 3);
        assert_eq!(results[0].position, 3);
        assert!(results[0].distance.abs() < 1e-5);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_empty_index() {
        let empty = IndexSnapshot::new(8, Vec::new()).unwrap();
        let index = HnswIndex::build(empty, 16, 200, 64);
        assert!(index.search(&[0.0; 8], 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let index = HnswIndex::build(snapshot(), 16, 200, 64);
        assert!(index.search(&[1.0; 4], 1).is_err());
        assert!(index.search(&[f32::NAN; 8], 1).is_err());
    }
}
