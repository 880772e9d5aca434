//! Deterministic collaborators for pipeline tests
#![allow(dead_code)]

use async_trait::async_trait;
use poseseek::config::RetrievalConfig;
use poseseek::embedding::{Embedder, EmbeddingError};
use poseseek::index::{IdMap, IndexHandle, Neighbor, VectorIndex, VectorIndexError, NO_NEIGHBOR};
use poseseek::rerank::{RerankCandidate, RerankError, RerankedItem, Reranker};
use poseseek::search::{CollaboratorTimeouts, SearchOrchestrator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DIM: usize = 4;

/// Distances from the reference scenario: linear scores 0.95, 0.75, 0.5, 0.1, 0.0
pub const SCENARIO_DISTANCES: [f32; 5] = [0.1, 0.5, 1.0, 1.8, 2.5];

/// Entity IDs for the scenario positions 0..5
pub const SCENARIO_IDS: [i64; 5] = [100, 101, 102, 103, 104];

/// Returns one fixed vector for every query
pub struct StaticEmbedder {
    vector: Vec<f32>,
    failure: Option<fn() -> EmbeddingError>,
    delay: Option<Duration>,
}

impl StaticEmbedder {
    pub fn new() -> Self {
        Self::with_vector(vec![0.5; DIM])
    }

    pub fn with_vector(vector: Vec<f32>) -> Self {
        Self {
            vector,
            failure: None,
            delay: None,
        }
    }

    pub fn failing(make_error: fn() -> EmbeddingError) -> Self {
        Self {
            failure: Some(make_error),
            ..Self::new()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(make_error) => Err(make_error()),
            None => Ok(self.vector.clone()),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

/// Bag-of-keywords embedder: one dimension per keyword, counting occurrences
pub struct KeywordEmbedder;

pub const KEYWORDS: [&str; DIM] = ["beach", "cafe", "studio", "street"];

impl KeywordEmbedder {
    pub fn vectorize(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "keywords"
    }
}

/// Preset neighbor list with call-count instrumentation
///
/// Pads with [`NO_NEIGHBOR`] when asked for more than it holds, like an exact
/// flat index.
pub struct CountingIndex {
    neighbors: Vec<Neighbor>,
    calls: Arc<AtomicUsize>,
}

impl CountingIndex {
    pub fn new(distances: &[f32]) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let neighbors = distances
            .iter()
            .enumerate()
            .map(|(position, distance)| Neighbor {
                position: position as i64,
                distance: *distance,
            })
            .collect();
        (
            Self {
                neighbors,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl VectorIndex for CountingIndex {
    fn search(&self, _query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.neighbors.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits: Vec<Neighbor> = self.neighbors.iter().take(k).copied().collect();
        while hits.len() < k {
            hits.push(Neighbor {
                position: NO_NEIGHBOR,
                distance: f32::MAX,
            });
        }
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.neighbors.len()
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn backend(&self) -> &'static str {
        "counting"
    }
}

/// Scenario index: positions 0..5 at [`SCENARIO_DISTANCES`], mapped to [`SCENARIO_IDS`]
pub fn scenario_handle() -> (IndexHandle, Arc<AtomicUsize>) {
    let (index, calls) = CountingIndex::new(&SCENARIO_DISTANCES);
    let handle = IndexHandle::new(Box::new(index), IdMap::from_ids(SCENARIO_IDS.to_vec()));
    (handle, calls)
}

/// `count` neighbors at distances 0.0, 0.05, 0.10, ... mapped to IDs 1000 + position
pub fn ladder_handle(count: usize) -> IndexHandle {
    let distances: Vec<f32> = (0..count).map(|i| i as f32 * 0.05).collect();
    let (index, _) = CountingIndex::new(&distances);
    let ids = (0..count as i64).map(|p| 1000 + p).collect();
    IndexHandle::new(Box::new(index), IdMap::from_ids(ids))
}

pub fn timeouts() -> CollaboratorTimeouts {
    CollaboratorTimeouts::from_secs(5, 5)
}

/// Orchestrator over `handle` with a working embedder and default retrieval settings
pub fn orchestrator(handle: IndexHandle) -> SearchOrchestrator {
    orchestrator_with(handle, RetrievalConfig::default())
}

pub fn orchestrator_with(handle: IndexHandle, config: RetrievalConfig) -> SearchOrchestrator {
    SearchOrchestrator::new(config, timeouts())
        .with_index(Arc::new(handle))
        .with_embedder(Arc::new(StaticEmbedder::new()))
}

/// What a [`ScriptedReranker`] does when called
#[derive(Clone)]
pub enum Script {
    Verdicts(Vec<(i64, f32)>),
    Fail,
    Malformed,
    Hang,
}

/// Reranker that plays back a fixed script and records its inputs
pub struct ScriptedReranker {
    script: Script,
    seen: Mutex<Vec<RerankCandidate>>,
}

impl ScriptedReranker {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<RerankCandidate> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reranker for ScriptedReranker {
    async fn rerank(
        &self,
        _query: &str,
        candidates: &[RerankCandidate],
        _desired: usize,
    ) -> Result<Vec<RerankedItem>, RerankError> {
        self.seen.lock().unwrap().extend_from_slice(candidates);
        match &self.script {
            Script::Verdicts(verdicts) => Ok(verdicts
                .iter()
                .map(|(entity_id, score)| RerankedItem {
                    entity_id: *entity_id,
                    score: *score,
                    reason: Some("scripted".to_string()),
                })
                .collect()),
            Script::Fail => Err(RerankError::RerankingError("connection reset".to_string())),
            Script::Malformed => Err(RerankError::Malformed("expected JSON object".to_string())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn ids(response: &poseseek::search::SearchResponse) -> Vec<i64> {
    response.results.iter().map(|r| r.entity_id).collect()
}

pub fn scores(response: &poseseek::search::SearchResponse) -> Vec<f32> {
    response.results.iter().map(|r| r.score).collect()
}

pub fn assert_close(got: &[f32], want: &[f32]) {
    assert_eq!(got.len(), want.len(), "{:?} vs {:?}", got, want);
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() < 1e-5, "{:?} vs {:?}", got, want);
    }
}
