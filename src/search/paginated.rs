use super::orchestrator::{sort_by_similarity, SearchOrchestrator};
use super::pagination::paginate;
use super::{PageInfo, RankedResult, SearchInfo, SearchMethod, SearchResponse};
use std::ops::ControlFlow;

impl SearchOrchestrator {
    /// Recall pool size covering `page` with headroom, capped
    pub fn pagination_pool(&self, page: usize, page_size: usize) -> usize {
        page.saturating_mul(page_size)
            .saturating_mul(self.config.pagination_headroom)
            .min(self.config.pagination_pool_cap)
    }

    /// Distance-filtered listing, one 1-based page at a time
    ///
    /// `max_distance` is a raw index distance, not a similarity. `total` is the
    /// filtered pool size before windowing.
    pub async fn paginated_search(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
        max_distance: f32,
    ) -> SearchResponse {
        let mut info = SearchInfo::new(SearchMethod::Paginated);
        let (index, vector) = match self.prepare(query, &mut info).await {
            ControlFlow::Continue(prepared) => prepared,
            ControlFlow::Break(mut response) => {
                response.page = Some(PageInfo {
                    page,
                    page_size,
                    has_next: false,
                });
                return response;
            }
        };

        let pool_size = self.pagination_pool(page, page_size);
        let mut pool = self.recall(&index, &vector, pool_size, &mut info);
        info.record_stage("recall", pool.len());

        pool.retain(|c| c.distance <= max_distance);
        sort_by_similarity(&mut pool);
        info.record_stage("filter", pool.len());

        let window = paginate(pool, page, page_size);
        let results: Vec<RankedResult> = window.items.iter().map(RankedResult::from).collect();

        let mut response = SearchResponse::finish(results, info);
        response.total = window.total;
        response.page = Some(PageInfo {
            page,
            page_size,
            has_next: window.has_next,
        });
        if response.results.is_empty() && window.total > 0 {
            response.info.suggestion = Some(format!(
                "Page {} is past the end; {} results are available.",
                page, window.total
            ));
        }
        response
    }
}
