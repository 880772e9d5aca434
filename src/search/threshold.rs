//! Adaptive similarity cutoffs
//!
//! Two distinct policies, used by different modes:
//! - [`quality_floor`]: batch-relative floor for multi-stage search
//! - [`dynamic_cutoff`]: rank-based cutoff for dynamic-threshold search

/// `max(min_similarity, mean(scores) × factor)`
///
/// An empty batch yields `min_similarity`.
pub fn quality_floor(scores: &[f32], min_similarity: f32, factor: f32) -> f32 {
    if scores.is_empty() {
        return min_similarity;
    }
    let average = scores.iter().sum::<f32>() / scores.len() as f32;
    min_similarity.max(average * factor)
}

/// Score of the `target`-th entry (clamped to `min_similarity`) when the pool
/// holds at least `target` entries, otherwise `min_similarity`.
///
/// `sorted_desc` must be sorted by descending score.
pub fn dynamic_cutoff(sorted_desc: &[f32], target: usize, min_similarity: f32) -> f32 {
    if target > 0 && sorted_desc.len() >= target {
        sorted_desc[target - 1].max(min_similarity)
    } else {
        min_similarity
    }
}

/// Mean of a score list, `None` when empty
pub fn average(scores: &[f32]) -> Option<f32> {
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f32>() / scores.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_floor_uses_batch_average() {
        // mean 0.8 → 0.64 beats 0.3
        let floor = quality_floor(&[0.9, 0.8, 0.7], 0.3, 0.8);
        assert!((floor - 0.64).abs() < 1e-6);
    }

    #[test]
    fn test_quality_floor_never_below_minimum() {
        // mean 0.2 → 0.16, minimum wins
        let floor = quality_floor(&[0.25, 0.15], 0.3, 0.8);
        assert_eq!(floor, 0.3);
        assert_eq!(quality_floor(&[], 0.3, 0.8), 0.3);
    }

    #[test]
    fn test_dynamic_cutoff_with_large_pool() {
        let pool = [0.95, 0.75, 0.5];
        assert_eq!(dynamic_cutoff(&pool, 3, 0.3), 0.5);
        assert_eq!(dynamic_cutoff(&pool, 1, 0.3), 0.95);
    }

    #[test]
    fn test_dynamic_cutoff_with_thin_pool() {
        let pool = [0.95, 0.75, 0.5];
        assert_eq!(dynamic_cutoff(&pool, 10, 0.3), 0.3);
        assert_eq!(dynamic_cutoff(&[], 1, 0.3), 0.3);
        assert_eq!(dynamic_cutoff(&pool, 0, 0.3), 0.3);
    }

    #[test]
    fn test_dynamic_cutoff_clamped_to_minimum() {
        assert_eq!(dynamic_cutoff(&[0.4, 0.1], 2, 0.3), 0.3);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[0.5, 1.0]), Some(0.75));
    }
}
