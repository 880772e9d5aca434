//! Retrieval core: similarity scoring, thresholds and the search modes
//!
//! [`SearchOrchestrator`] composes an [`Embedder`](crate::embedding::Embedder),
//! an [`IndexHandle`](crate::index::IndexHandle) and an optional
//! [`Reranker`](crate::rerank::Reranker) into five modes:
//!
//! - basic: top-k recall in index order
//! - multi-stage: recall, rerank, then a batch-relative quality floor
//! - dynamic: rank-based cutoff over a wide pool
//! - multi-tier: strict, adaptive and loose tiers, escalating on demand
//! - paginated: distance-filtered listing in 1-based pages
//!
//! No mode returns an error for collaborator faults. Unavailable services,
//! failed embeddings and reranker faults all produce a well-formed response
//! with diagnostics in [`SearchInfo`].

mod basic;
mod dynamic;
mod multi_stage;
mod orchestrator;
mod paginated;
pub mod pagination;
pub mod similarity;
pub mod threshold;
mod tiered;
mod types;

pub use orchestrator::{CollaboratorTimeouts, SearchOrchestrator};
pub use pagination::{paginate, Page};
pub use similarity::SimilarityPolicy;
pub use threshold::{dynamic_cutoff, quality_floor};
pub use types::{
    Candidate, PageInfo, RankedResult, SearchInfo, SearchMethod, SearchMode, SearchRequest,
    SearchResponse, StageCount, Tier,
};
