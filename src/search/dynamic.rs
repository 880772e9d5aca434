use super::orchestrator::{empty_request, sort_by_similarity, SearchOrchestrator};
use super::threshold::dynamic_cutoff;
use super::{RankedResult, SearchInfo, SearchMethod, SearchResponse};
use crate::index::IndexHandle;
use std::ops::ControlFlow;

impl SearchOrchestrator {
    /// Rank-based adaptive cutoff over a wide recall pool
    ///
    /// Returns at most `target_count` results, all scoring at least `min_similarity`.
    pub async fn dynamic_threshold_search(
        &self,
        query: &str,
        target_count: usize,
        min_similarity: f32,
    ) -> SearchResponse {
        if target_count == 0 {
            return empty_request(SearchMethod::Dynamic);
        }

        let mut info = SearchInfo::new(SearchMethod::Dynamic);
        let (index, vector) = match self.prepare(query, &mut info).await {
            ControlFlow::Continue(prepared) => prepared,
            ControlFlow::Break(response) => return response,
        };

        let results =
            self.dynamic_with_vector(&index, &vector, target_count, min_similarity, &mut info);
        SearchResponse::finish(results, info)
    }

    pub(super) fn dynamic_with_vector(
        &self,
        index: &IndexHandle,
        vector: &[f32],
        target_count: usize,
        min_similarity: f32,
        info: &mut SearchInfo,
    ) -> Vec<RankedResult> {
        let pool_size = target_count
            .saturating_mul(self.config.dynamic_pool_multiplier)
            .min(self.config.dynamic_pool_cap)
            .max(target_count);

        let mut pool = self.recall(index, vector, pool_size, info);
        info.record_stage("recall", pool.len());

        pool.retain(|c| c.similarity >= min_similarity);
        sort_by_similarity(&mut pool);

        let scores: Vec<f32> = pool.iter().map(|c| c.similarity).collect();
        let cutoff = dynamic_cutoff(&scores, target_count, min_similarity);
        info.applied_threshold = Some(cutoff);

        let results: Vec<RankedResult> = pool
            .iter()
            .filter(|c| c.similarity >= cutoff)
            .take(target_count)
            .map(RankedResult::from)
            .collect();
        info.record_stage("threshold", results.len());

        tracing::debug!(
            "Dynamic threshold: pool {}, cutoff {:.3}, {} results",
            pool.len(),
            cutoff,
            results.len()
        );
        results
    }
}
