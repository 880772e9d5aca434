//! Request, candidate and response types

use crate::error::{PoseSeekError, Result};
use serde::{Deserialize, Serialize};

/// A recalled catalogue entity before reranking or filtering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub entity_id: i64,
    /// Raw squared-L2 distance from the index
    pub distance: f32,
    /// Derived from `distance` by the active similarity policy
    pub similarity: f32,
    /// Catalogue description, attached only for reranker input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One entry of the ordered result list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub entity_id: i64,
    pub score: f32,
}

impl From<&Candidate> for RankedResult {
    fn from(candidate: &Candidate) -> Self {
        Self {
            entity_id: candidate.entity_id,
            score: candidate.similarity,
        }
    }
}

/// Mode plus its size controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchMode {
    /// Plain top-k recall
    Basic { top_k: usize },
    /// Recall → rerank → quality filter
    MultiStage {
        final_k: usize,
        #[serde(default)]
        stage1_k: Option<usize>,
        #[serde(default)]
        min_similarity: Option<f32>,
    },
    /// Rank-based adaptive cutoff
    Dynamic {
        target_count: usize,
        #[serde(default)]
        min_similarity: Option<f32>,
    },
    /// Strict → adaptive → loose escalation
    MultiTier { target_count: usize },
    /// Distance-filtered, windowed listing
    Paginated {
        page: usize,
        page_size: usize,
        /// Maximum acceptable raw distance; smaller is stricter
        max_distance: f32,
    },
}

impl SearchMode {
    pub fn method(&self) -> SearchMethod {
        match self {
            SearchMode::Basic { .. } => SearchMethod::Basic,
            SearchMode::MultiStage { .. } => SearchMethod::MultiStage,
            SearchMode::Dynamic { .. } => SearchMethod::Dynamic,
            SearchMode::MultiTier { .. } => SearchMethod::MultiTier,
            SearchMode::Paginated { .. } => SearchMethod::Paginated,
        }
    }
}

/// Search request as received from the outer layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(flatten)]
    pub mode: SearchMode,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            query: query.into(),
            mode,
        }
    }

    /// Boundary checks; the search core itself never rejects a request
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(PoseSeekError::InvalidRequest(
                "Query cannot be empty".to_string(),
            ));
        }

        let check_similarity = |value: Option<f32>| -> Result<()> {
            match value {
                Some(v) if !(0.0..=1.0).contains(&v) => Err(PoseSeekError::InvalidRequest(
                    format!("min_similarity must be between 0 and 1, got {}", v),
                )),
                _ => Ok(()),
            }
        };

        match &self.mode {
            SearchMode::MultiStage { min_similarity, .. }
            | SearchMode::Dynamic { min_similarity, .. } => check_similarity(*min_similarity),
            SearchMode::Paginated {
                page,
                page_size,
                max_distance,
            } => {
                if *page == 0 {
                    return Err(PoseSeekError::InvalidRequest(
                        "page is 1-based".to_string(),
                    ));
                }
                if *page_size == 0 {
                    return Err(PoseSeekError::InvalidRequest(
                        "page_size must be greater than 0".to_string(),
                    ));
                }
                if max_distance.is_nan() || *max_distance < 0.0 {
                    return Err(PoseSeekError::InvalidRequest(format!(
                        "max_distance must be a non-negative distance, got {}",
                        max_distance
                    )));
                }
                Ok(())
            }
            SearchMode::Basic { .. } | SearchMode::MultiTier { .. } => Ok(()),
        }
    }
}

/// Which mode produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Basic,
    MultiStage,
    Dynamic,
    MultiTier,
    Paginated,
}

/// Multi-tier escalation level that produced the final result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Strict,
    Adaptive,
    Loose,
}

/// Candidate count after a named stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: String,
    pub count: usize,
}

/// Diagnostics attached to every response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchInfo {
    pub method: SearchMethod,
    /// False when the index or embedder is not loaded
    pub available: bool,
    pub stages: Vec<StageCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f32>,
    pub warnings: Vec<String>,
    /// Human-readable hint when the result list is empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl SearchInfo {
    pub fn new(method: SearchMethod) -> Self {
        Self {
            method,
            available: true,
            stages: Vec::new(),
            applied_threshold: None,
            tier: None,
            average_score: None,
            warnings: Vec::new(),
            suggestion: None,
        }
    }

    pub fn record_stage(&mut self, stage: &str, count: usize) {
        self.stages.push(StageCount {
            stage: stage.to_string(),
            count,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Count recorded for `stage`, if it ran
    pub fn stage_count(&self, stage: &str) -> Option<usize> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.count)
    }
}

/// Paging metadata for paginated responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub page_size: usize,
    pub has_next: bool,
}

/// Response returned by every mode; never an error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<RankedResult>,
    /// Result count, or the post-filter pool size for paginated search
    pub total: usize,
    pub info: SearchInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageInfo>,
}

impl SearchResponse {
    /// Response for `results`, filling in `total`, the average score and the empty-result hint
    pub fn finish(results: Vec<RankedResult>, mut info: SearchInfo) -> Self {
        let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
        info.average_score = super::threshold::average(&scores);
        if results.is_empty() && info.suggestion.is_none() {
            info.suggestion = Some(
                "No poses matched. Try broader wording, fewer details, or a lower minimum similarity."
                    .to_string(),
            );
        }
        Self {
            total: results.len(),
            results,
            info,
            page: None,
        }
    }

    /// Empty response for a service that is not ready
    pub fn unavailable(method: SearchMethod, reason: impl Into<String>) -> Self {
        let mut info = SearchInfo::new(method);
        info.available = false;
        info.warn(reason);
        info.suggestion = Some(
            "Vector search is unavailable. Build the index with `poseseek build-index` and check the embedding settings."
                .to_string(),
        );
        Self {
            results: Vec::new(),
            total: 0,
            info,
            page: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_shape() {
        let json = r#"{"query": "cafe", "mode": "multi_stage", "final_k": 10}"#;
        let request: SearchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request.mode,
            SearchMode::MultiStage {
                final_k: 10,
                stage1_k: None,
                min_similarity: None
            }
        );
        assert_eq!(request.mode.method(), SearchMethod::MultiStage);
    }

    #[test]
    fn test_validate_rejects_blank_query() {
        let request = SearchRequest::new("   ", SearchMode::Basic { top_k: 5 });
        assert!(matches!(
            request.validate(),
            Err(PoseSeekError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_paging_contract() {
        let paged = |page, page_size, max_distance| {
            SearchRequest::new(
                "beach",
                SearchMode::Paginated {
                    page,
                    page_size,
                    max_distance,
                },
            )
        };
        assert!(paged(1, 10, 1.5).validate().is_ok());
        assert!(paged(0, 10, 1.5).validate().is_err());
        assert!(paged(1, 0, 1.5).validate().is_err());
        assert!(paged(1, 10, -0.1).validate().is_err());
        assert!(paged(1, 10, f32::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_similarity_range() {
        let request = SearchRequest::new(
            "beach",
            SearchMode::Dynamic {
                target_count: 5,
                min_similarity: Some(1.5),
            },
        );
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_unavailable_response() {
        let response = SearchResponse::unavailable(SearchMethod::Basic, "index not loaded");
        assert!(!response.info.available);
        assert_eq!(response.total, 0);
        assert!(response.results.is_empty());
        assert_eq!(response.info.warnings, vec!["index not loaded".to_string()]);
    }

    #[test]
    fn test_finish_adds_suggestion_only_when_empty() {
        let empty = SearchResponse::finish(Vec::new(), SearchInfo::new(SearchMethod::Basic));
        assert!(empty.info.suggestion.is_some());

        let hit = SearchResponse::finish(
            vec![RankedResult {
                entity_id: 1,
                score: 0.5,
            }],
            SearchInfo::new(SearchMethod::Basic),
        );
        assert!(hit.info.suggestion.is_none());
        assert_eq!(hit.total, 1);
        assert_eq!(hit.info.average_score, Some(0.5));
    }
}
