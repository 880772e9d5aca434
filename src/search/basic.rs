use super::orchestrator::{empty_request, SearchOrchestrator};
use super::{RankedResult, SearchInfo, SearchMethod, SearchResponse};
use std::ops::ControlFlow;

impl SearchOrchestrator {
    /// Plain top-k recall in index order, no filtering
    pub async fn basic_search(&self, query: &str, top_k: usize) -> SearchResponse {
        if top_k == 0 {
            return empty_request(SearchMethod::Basic);
        }

        let mut info = SearchInfo::new(SearchMethod::Basic);
        let (index, vector) = match self.prepare(query, &mut info).await {
            ControlFlow::Continue(prepared) => prepared,
            ControlFlow::Break(response) => return response,
        };

        let candidates = self.recall(&index, &vector, top_k, &mut info);
        info.record_stage("recall", candidates.len());

        let results: Vec<RankedResult> = candidates.iter().map(RankedResult::from).collect();
        tracing::debug!("Basic search returned {} results", results.len());
        SearchResponse::finish(results, info)
    }
}
