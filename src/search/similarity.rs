//! Distance → similarity transform

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How squared-L2 distance maps onto a [0, 1]-like similarity.
///
/// One policy per deployment: thresholds such as `min_similarity` are
/// calibrated against a single policy's range and do not carry over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityPolicy {
    /// `max(0, 1 - d/2)`; hits 0 at distance 2 (opposite unit vectors under cosine)
    #[default]
    Linear,
    /// `exp(-d)`
    Exponential,
    /// `exp(-d/2)`
    HalfExponential,
}

impl SimilarityPolicy {
    /// Monotone non-increasing in `distance`, never below 0
    pub fn similarity(self, distance: f32) -> f32 {
        if distance.is_nan() {
            return 0.0;
        }
        let d = distance.max(0.0);
        match self {
            SimilarityPolicy::Linear => (1.0 - d / 2.0).max(0.0),
            SimilarityPolicy::Exponential => (-d).exp(),
            SimilarityPolicy::HalfExponential => (-d / 2.0).exp(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SimilarityPolicy::Linear => "linear",
            SimilarityPolicy::Exponential => "exponential",
            SimilarityPolicy::HalfExponential => "half-exponential",
        }
    }
}

impl fmt::Display for SimilarityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(SimilarityPolicy::Linear),
            "exponential" => Ok(SimilarityPolicy::Exponential),
            "half-exponential" => Ok(SimilarityPolicy::HalfExponential),
            other => Err(format!(
                "Unknown similarity policy '{}', expected linear, exponential or half-exponential",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICIES: [SimilarityPolicy; 3] = [
        SimilarityPolicy::Linear,
        SimilarityPolicy::Exponential,
        SimilarityPolicy::HalfExponential,
    ];

    #[test]
    fn test_monotone_non_increasing() {
        let distances = [0.0, 0.01, 0.1, 0.5, 1.0, 1.5, 1.99, 2.0, 2.5, 10.0, f32::MAX];
        for policy in POLICIES {
            for pair in distances.windows(2) {
                assert!(
                    policy.similarity(pair[0]) >= policy.similarity(pair[1]),
                    "{} not monotone between {} and {}",
                    policy,
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn test_bounded_below_by_zero() {
        for policy in POLICIES {
            assert!(policy.similarity(f32::MAX) >= 0.0);
            assert!(policy.similarity(f32::NAN) >= 0.0);
            assert!(policy.similarity(-1.0) <= 1.0);
        }
    }

    #[test]
    fn test_linear_values() {
        let p = SimilarityPolicy::Linear;
        let scores: Vec<f32> = [0.1, 0.5, 1.0, 1.8, 2.5]
            .iter()
            .map(|d| p.similarity(*d))
            .collect();
        let expected = [0.95, 0.75, 0.5, 0.1, 0.0];
        for (got, want) in scores.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_exponential_values() {
        assert!((SimilarityPolicy::Exponential.similarity(1.0) - (-1.0f32).exp()).abs() < 1e-6);
        assert!(
            (SimilarityPolicy::HalfExponential.similarity(1.0) - (-0.5f32).exp()).abs() < 1e-6
        );
        assert_eq!(SimilarityPolicy::Exponential.similarity(0.0), 1.0);
    }

    #[test]
    fn test_parse_round_trip() {
        for policy in POLICIES {
            assert_eq!(policy.to_string().parse::<SimilarityPolicy>(), Ok(policy));
        }
        assert!("cosine".parse::<SimilarityPolicy>().is_err());
    }
}
