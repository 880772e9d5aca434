/// Exact brute-force index over squared L2 distance
use super::{
    check_query, squared_l2, IndexSnapshot, Neighbor, VectorIndex, VectorIndexError, NO_NEIGHBOR,
};

/// Flat index: every query scans every vector
///
/// When asked for more neighbors than it holds, the missing slots are filled
/// with position -1, matching what exact flat indexes report.
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self, VectorIndexError> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(VectorIndexError::InvalidDimension {
                expected: dimension,
                actual: bad.len(),
            });
        }
        Ok(Self { dimension, vectors })
    }

    /// Snapshots are validated on load, so no dimension check here
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            dimension: snapshot.dimension,
            vectors: snapshot.vectors,
        }
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        check_query(query, self.dimension)?;

        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| Neighbor {
                position: position as i64,
                distance: squared_l2(query, v),
            })
            .collect();

        // Stable: equal distances keep position order
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        while scored.len() < k {
            scored.push(Neighbor {
                position: NO_NEIGHBOR,
                distance: f32::MAX,
            });
        }

        Ok(scored)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend(&self) -> &'static str {
        "flat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_index() -> FlatIndex {
        FlatIndex::new(
            2,
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]],
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_first() {
        let index = unit_index();
        let results = index.search(&[1.0, 0.0], 3).unwrap();

        let positions: Vec<i64> = results.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 2, 1]);
        assert_eq!(results[0].distance, 0.0);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_pads_with_no_neighbor() {
        let index = unit_index();
        let results = index.search(&[1.0, 0.0], 5).unwrap();

        assert_eq!(results.len(), 5);
        assert_eq!(results[3].position, NO_NEIGHBOR);
        assert_eq!(results[4].position, NO_NEIGHBOR);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = FlatIndex::new(2, Vec::new()).unwrap();
        assert!(index.search(&[1.0, 0.0], 10).unwrap().is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let index = unit_index();
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1),
            Err(VectorIndexError::InvalidDimension {
                expected: 2,
                actual: 3
            })
        ));
        assert!(FlatIndex::new(2, vec![vec![1.0]]).is_err());
    }

    #[test]
    fn test_non_finite_query_is_a_search_error() {
        let index = unit_index();
        assert!(matches!(
            index.search(&[f32::INFINITY, 0.0], 2),
            Err(VectorIndexError::SearchError(_))
        ));
    }
}
