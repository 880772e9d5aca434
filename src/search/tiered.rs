//! Multi-tier escalation: strict, then adaptive, then loose
//!
//! The query is embedded once and the vector reused by every tier. A tier runs
//! only when the previous one under-delivered, and tier outputs are never merged.

use super::orchestrator::{empty_request, sort_by_similarity, SearchOrchestrator};
use super::{RankedResult, SearchInfo, SearchMethod, SearchResponse, Tier};
use std::ops::ControlFlow;

impl SearchOrchestrator {
    pub async fn multi_tier_search(&self, query: &str, target_count: usize) -> SearchResponse {
        if target_count == 0 {
            return empty_request(SearchMethod::MultiTier);
        }

        let mut info = SearchInfo::new(SearchMethod::MultiTier);
        let (index, vector) = match self.prepare(query, &mut info).await {
            ControlFlow::Continue(prepared) => prepared,
            ControlFlow::Break(response) => return response,
        };

        // Strict: plain top-k, optionally with an absolute floor
        let mut strict = self.recall(&index, &vector, target_count, &mut info);
        if let Some(floor) = self.config.strict_min_similarity {
            strict.retain(|c| c.similarity >= floor);
        }
        info.record_stage("strict", strict.len());
        if strict.len() >= target_count {
            let results = strict.iter().map(RankedResult::from).collect();
            let threshold = self.config.strict_min_similarity;
            return self.settle(Tier::Strict, results, threshold, info);
        }

        // Adaptive: dynamic threshold at a relaxed minimum
        let mut adaptive_info = SearchInfo::new(SearchMethod::Dynamic);
        let adaptive = self.dynamic_with_vector(
            &index,
            &vector,
            target_count,
            self.config.adaptive_min_similarity,
            &mut adaptive_info,
        );
        info.warnings.append(&mut adaptive_info.warnings);
        for stage in &adaptive_info.stages {
            info.record_stage(&format!("adaptive_{}", stage.stage), stage.count);
        }
        info.record_stage("adaptive", adaptive.len());
        if adaptive.len() >= target_count {
            // Report the rank cutoff that actually filtered, not the relaxed minimum
            let threshold = adaptive_info.applied_threshold;
            return self.settle(Tier::Adaptive, adaptive, threshold, info);
        }

        // Loose: widest pool, lowest floor, returned whatever its size
        let pool_size = target_count
            .saturating_mul(self.config.loose_pool_multiplier)
            .min(self.config.loose_pool_cap)
            .max(target_count);
        let mut loose = self.recall(&index, &vector, pool_size, &mut info);
        loose.retain(|c| c.similarity >= self.config.loose_min_similarity);
        sort_by_similarity(&mut loose);
        loose.truncate(target_count);
        info.record_stage("loose", loose.len());

        let results = loose.iter().map(RankedResult::from).collect();
        let threshold = Some(self.config.loose_min_similarity);
        self.settle(Tier::Loose, results, threshold, info)
    }

    fn settle(
        &self,
        tier: Tier,
        results: Vec<RankedResult>,
        threshold: Option<f32>,
        mut info: SearchInfo,
    ) -> SearchResponse {
        tracing::debug!(
            "Multi-tier search settled on {:?} with {} results",
            tier,
            results.len()
        );
        info.tier = Some(tier);
        info.applied_threshold = threshold;
        SearchResponse::finish(results, info)
    }
}
