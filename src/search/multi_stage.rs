//! Recall → rerank → quality filter

use super::orchestrator::{empty_request, sort_by_similarity, SearchOrchestrator};
use super::threshold::quality_floor;
use super::{Candidate, RankedResult, SearchInfo, SearchMethod, SearchResponse};
use crate::rerank::{RerankCandidate, RerankedItem};
use std::collections::HashSet;
use std::ops::ControlFlow;

impl SearchOrchestrator {
    /// Stage-1 recall width: caller's choice, else `min(cap, final_k × multiplier)`
    pub fn stage1_width(&self, final_k: usize, stage1_k: Option<usize>) -> usize {
        stage1_k
            .unwrap_or_else(|| {
                final_k
                    .saturating_mul(self.config.stage1_multiplier)
                    .min(self.config.stage1_cap)
            })
            .max(final_k)
    }

    /// Multi-stage search
    ///
    /// Any reranker fault degrades to the stage-1 candidates truncated to
    /// `final_k` in recall order with their original scores; the quality filter
    /// only runs on reranked output.
    pub async fn multi_stage_search(
        &self,
        query: &str,
        final_k: usize,
        stage1_k: Option<usize>,
        min_similarity: f32,
    ) -> SearchResponse {
        if final_k == 0 {
            return empty_request(SearchMethod::MultiStage);
        }

        let mut info = SearchInfo::new(SearchMethod::MultiStage);
        let (index, vector) = match self.prepare(query, &mut info).await {
            ControlFlow::Continue(prepared) => prepared,
            ControlFlow::Break(response) => return response,
        };

        let width = self.stage1_width(final_k, stage1_k);
        let mut candidates = self.recall(&index, &vector, width, &mut info);
        info.record_stage("recall", candidates.len());
        if candidates.is_empty() {
            return SearchResponse::finish(Vec::new(), info);
        }

        let reranked = match self.rerank(query, &mut candidates, final_k, &mut info).await {
            Some(reranked) => reranked,
            None => {
                candidates.truncate(final_k);
                let results = candidates.iter().map(RankedResult::from).collect();
                return SearchResponse::finish(results, info);
            }
        };
        info.record_stage("rerank", reranked.len());

        let scores: Vec<f32> = reranked.iter().map(|r| r.score).collect();
        let floor = quality_floor(&scores, min_similarity, self.config.quality_floor_factor);
        info.applied_threshold = Some(floor);

        let before = reranked.len();
        let results: Vec<RankedResult> = reranked
            .into_iter()
            .filter(|r| r.score >= floor)
            .collect();
        info.record_stage("filter", results.len());
        tracing::info!(
            "quality filter: {} -> {} (threshold {:.3})",
            before,
            results.len(),
            floor
        );

        SearchResponse::finish(results, info)
    }

    /// Run the reranker on `candidates`; `None` means fall back to recall order
    async fn rerank(
        &self,
        query: &str,
        candidates: &mut [Candidate],
        final_k: usize,
        info: &mut SearchInfo,
    ) -> Option<Vec<RankedResult>> {
        let Some(reranker) = &self.reranker else {
            info.warn("reranker not configured, using recall order");
            return None;
        };

        self.attach_descriptions(candidates, info);
        let inputs: Vec<RerankCandidate> = candidates
            .iter()
            .map(|c| RerankCandidate {
                entity_id: c.entity_id,
                prior_score: c.similarity,
                text: c.text.clone().unwrap_or_default(),
            })
            .collect();

        let outcome =
            tokio::time::timeout(self.timeouts.reranking, reranker.rerank(query, &inputs, final_k))
                .await;

        let verdicts = match outcome {
            Ok(Ok(verdicts)) => verdicts,
            Ok(Err(e)) => {
                info.warn(format!(
                    "reranking failed ({:?}), using recall order: {}",
                    e.kind(),
                    e
                ));
                return None;
            }
            Err(_) => {
                info.warn(format!(
                    "reranking timed out after {} ms, using recall order",
                    self.timeouts.reranking.as_millis()
                ));
                return None;
            }
        };

        match self.accept_verdicts(candidates, verdicts, final_k) {
            Ok(results) => Some(results),
            Err(reason) => {
                info.warn(format!("reranker output rejected, using recall order: {}", reason));
                None
            }
        }
    }

    /// Keep verdicts above the acceptance floor, best first, at most `final_k`
    fn accept_verdicts(
        &self,
        candidates: &[Candidate],
        verdicts: Vec<RerankedItem>,
        final_k: usize,
    ) -> Result<Vec<RankedResult>, String> {
        let known: HashSet<i64> = candidates.iter().map(|c| c.entity_id).collect();
        let mut seen = HashSet::new();
        let mut accepted = Vec::with_capacity(verdicts.len());

        for verdict in verdicts {
            if !known.contains(&verdict.entity_id) {
                return Err(format!("unknown entity id {}", verdict.entity_id));
            }
            if !seen.insert(verdict.entity_id) {
                return Err(format!("duplicate entity id {}", verdict.entity_id));
            }
            if !(0.0..=1.0).contains(&verdict.score) {
                return Err(format!(
                    "score {} for entity {} outside [0, 1]",
                    verdict.score, verdict.entity_id
                ));
            }
            if verdict.score > self.acceptance_floor {
                accepted.push(Candidate {
                    entity_id: verdict.entity_id,
                    distance: 0.0,
                    similarity: verdict.score,
                    text: None,
                });
            }
        }

        sort_by_similarity(&mut accepted);
        accepted.truncate(final_k);
        Ok(accepted.iter().map(RankedResult::from).collect())
    }

    fn attach_descriptions(&self, candidates: &mut [Candidate], info: &mut SearchInfo) {
        let Some(store) = &self.descriptions else {
            return;
        };

        let mut failures = 0usize;
        for candidate in candidates.iter_mut() {
            match store.description(candidate.entity_id) {
                Ok(text) => candidate.text = text,
                Err(e) => {
                    failures += 1;
                    tracing::debug!("No description for {}: {}", candidate.entity_id, e);
                }
            }
        }
        if failures > 0 {
            info.warn(format!("{} candidate descriptions could not be loaded", failures));
        }
    }
}
