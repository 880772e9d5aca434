//! Search orchestrator: owns the collaborators and dispatches modes

use super::{Candidate, SearchInfo, SearchMethod, SearchMode, SearchRequest, SearchResponse};
use crate::catalogue::DescriptionStore;
use crate::config::RetrievalConfig;
use crate::embedding::Embedder;
use crate::error::{FailureKind, Result};
use crate::index::{IndexHandle, Neighbor, NO_NEIGHBOR};
use crate::rerank::Reranker;
use crate::search::SimilarityPolicy;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

/// Budgets for the two network-bound collaborator calls
#[derive(Debug, Clone, Copy)]
pub struct CollaboratorTimeouts {
    pub embedding: Duration,
    pub reranking: Duration,
}

impl CollaboratorTimeouts {
    pub fn from_secs(embedding: u64, reranking: u64) -> Self {
        Self {
            embedding: Duration::from_secs(embedding),
            reranking: Duration::from_secs(reranking),
        }
    }
}

/// Composes embedder, index, reranker and thresholds into the search modes
///
/// Holds only shared read-only handles; every call is independent and may run
/// concurrently with others.
pub struct SearchOrchestrator {
    pub(super) index: Option<Arc<IndexHandle>>,
    pub(super) embedder: Option<Arc<dyn Embedder>>,
    pub(super) reranker: Option<Arc<dyn Reranker>>,
    pub(super) descriptions: Option<Arc<dyn DescriptionStore>>,
    pub(super) config: RetrievalConfig,
    pub(super) timeouts: CollaboratorTimeouts,
    pub(super) acceptance_floor: f32,
}

/// Query vector ready for recall, or the response to return straight away
pub(super) type Prepared = ControlFlow<SearchResponse, (Arc<IndexHandle>, Vec<f32>)>;

impl SearchOrchestrator {
    pub fn new(config: RetrievalConfig, timeouts: CollaboratorTimeouts) -> Self {
        Self {
            index: None,
            embedder: None,
            reranker: None,
            descriptions: None,
            config,
            timeouts,
            acceptance_floor: 0.6,
        }
    }

    pub fn with_index(mut self, index: Arc<IndexHandle>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Verdicts scoring at or below `acceptance_floor` are dropped
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>, acceptance_floor: f32) -> Self {
        self.reranker = Some(reranker);
        self.acceptance_floor = acceptance_floor;
        self
    }

    pub fn with_descriptions(mut self, store: Arc<dyn DescriptionStore>) -> Self {
        self.descriptions = Some(store);
        self
    }

    pub fn policy(&self) -> SimilarityPolicy {
        self.config.similarity_policy
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Index and embedder both loaded
    pub fn is_available(&self) -> bool {
        self.index.is_some() && self.embedder.is_some()
    }

    pub fn index(&self) -> Option<&Arc<IndexHandle>> {
        self.index.as_ref()
    }

    pub fn embedder(&self) -> Option<&Arc<dyn Embedder>> {
        self.embedder.as_ref()
    }

    /// Validate at the boundary, then run the requested mode
    pub async fn execute(&self, request: &SearchRequest) -> Result<SearchResponse> {
        request.validate()?;
        Ok(self.search(request).await)
    }

    /// Run the requested mode; always returns a well-formed response
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        let query = request.query.as_str();
        match request.mode {
            SearchMode::Basic { top_k } => self.basic_search(query, top_k).await,
            SearchMode::MultiStage {
                final_k,
                stage1_k,
                min_similarity,
            } => {
                let min_similarity =
                    min_similarity.unwrap_or(self.config.default_min_similarity);
                self.multi_stage_search(query, final_k, stage1_k, min_similarity)
                    .await
            }
            SearchMode::Dynamic {
                target_count,
                min_similarity,
            } => {
                let min_similarity =
                    min_similarity.unwrap_or(self.config.default_min_similarity);
                self.dynamic_threshold_search(query, target_count, min_similarity)
                    .await
            }
            SearchMode::MultiTier { target_count } => {
                self.multi_tier_search(query, target_count).await
            }
            SearchMode::Paginated {
                page,
                page_size,
                max_distance,
            } => {
                self.paginated_search(query, page, page_size, max_distance)
                    .await
            }
        }
    }

    /// Availability check and query embedding, shared by every mode
    pub(super) async fn prepare(&self, query: &str, info: &mut SearchInfo) -> Prepared {
        let (index, embedder) = match (&self.index, &self.embedder) {
            (Some(index), Some(embedder)) => (Arc::clone(index), Arc::clone(embedder)),
            (None, _) => {
                return ControlFlow::Break(SearchResponse::unavailable(
                    info.method,
                    "vector index is not loaded",
                ))
            }
            (_, None) => {
                return ControlFlow::Break(SearchResponse::unavailable(
                    info.method,
                    "embedding service is not configured",
                ))
            }
        };

        if query.trim().is_empty() {
            info.suggestion = Some("Enter a description of the pose to search for.".to_string());
            return ControlFlow::Break(SearchResponse::finish(Vec::new(), info.clone()));
        }

        let embedded = tokio::time::timeout(self.timeouts.embedding, embedder.embed(query)).await;
        let vector = match embedded {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) if e.kind() == FailureKind::Unavailable => {
                return ControlFlow::Break(SearchResponse::unavailable(
                    info.method,
                    format!("embedding service unavailable: {}", e),
                ));
            }
            Ok(Err(e)) => {
                info.warn(format!("embedding failed: {}", e));
                return ControlFlow::Break(SearchResponse::finish(Vec::new(), info.clone()));
            }
            Err(_) => {
                info.warn(format!(
                    "embedding timed out after {} ms",
                    self.timeouts.embedding.as_millis()
                ));
                return ControlFlow::Break(SearchResponse::finish(Vec::new(), info.clone()));
            }
        };

        if vector.len() != index.dimension() {
            info.warn(format!(
                "embedding dimension {} does not match index dimension {}",
                vector.len(),
                index.dimension()
            ));
            return ControlFlow::Break(SearchResponse::finish(Vec::new(), info.clone()));
        }

        ControlFlow::Continue((index, vector))
    }

    /// k-NN recall with ID-map translation and similarity scoring
    ///
    /// Positions of -1 and positions missing from the ID map never leave this function.
    pub(super) fn recall(
        &self,
        index: &IndexHandle,
        vector: &[f32],
        k: usize,
        info: &mut SearchInfo,
    ) -> Vec<Candidate> {
        if k == 0 {
            return Vec::new();
        }

        match index.search(vector, k) {
            Ok(neighbors) => self.translate(index, neighbors),
            Err(e) => {
                info.warn(format!("vector search failed: {}", e));
                Vec::new()
            }
        }
    }

    fn translate(&self, index: &IndexHandle, neighbors: Vec<Neighbor>) -> Vec<Candidate> {
        let policy = self.policy();
        neighbors
            .into_iter()
            .filter_map(|n| {
                if n.position == NO_NEIGHBOR {
                    return None;
                }
                let Some(entity_id) = index.entity_id(n.position) else {
                    tracing::warn!("Index position {} has no entry in the ID map", n.position);
                    return None;
                };
                Some(Candidate {
                    entity_id,
                    distance: n.distance,
                    similarity: policy.similarity(n.distance),
                    text: None,
                })
            })
            .collect()
    }
}

/// Stable sort by descending similarity
pub(super) fn sort_by_similarity(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Zero-size requests short-circuit to an empty response
pub(super) fn empty_request(method: SearchMethod) -> SearchResponse {
    let mut info = SearchInfo::new(method);
    info.suggestion = Some("Requested result count is zero.".to_string());
    SearchResponse::finish(Vec::new(), info)
}
