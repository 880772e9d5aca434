//! Chat-completion reranker
//!
//! The model is asked for a JSON object; the reply is deserialized into a
//! fixed schema and validated against the candidate set. Anything that does
//! not validate is a [`RerankError::Malformed`].

use super::{RerankCandidate, RerankError, RerankedItem, Reranker};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Schema the model must answer with
#[derive(Deserialize)]
struct RerankPayload {
    reranked_results: Vec<RerankEntry>,
    #[serde(default)]
    #[allow(dead_code)]
    filtered_count: Option<usize>,
}

#[derive(Deserialize)]
struct RerankEntry {
    id: i64,
    score: f32,
    #[serde(default)]
    reason: Option<String>,
}

/// Reranker that delegates relevance judgement to a chat model
pub struct LlmReranker {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model_name: String,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
    acceptance_floor: f32,
    snippet_chars: usize,
}

impl LlmReranker {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RerankError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RerankError::InitializationError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model_name: model_name.into(),
            timeout,
            temperature: 0.1,
            max_tokens: 1000,
            acceptance_floor: 0.6,
            snippet_chars: 200,
        })
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Floor quoted to the model and the per-candidate text budget
    pub fn with_prompt_limits(mut self, acceptance_floor: f32, snippet_chars: usize) -> Self {
        self.acceptance_floor = acceptance_floor;
        self.snippet_chars = snippet_chars;
        self
    }

    fn build_prompt(&self, query: &str, candidates: &[RerankCandidate], desired: usize) -> String {
        let mut listing = String::new();
        for (i, candidate) in candidates.iter().enumerate() {
            let snippet: String = candidate.text.chars().take(self.snippet_chars).collect();
            let _ = write!(
                listing,
                "\n{}. ID:{} (vector similarity: {:.3})\nContent: {}\n",
                i + 1,
                candidate.entity_id,
                candidate.prior_score,
                snippet
            );
        }

        format!(
            r#"You rank photo pose references for a search engine. The user searched for: "{query}"

Candidates:
{listing}
Reorder the candidates by how well they match the intent of the query and keep only relevant ones.

Judge by:
1. Semantic relevance to the query intent
2. Keyword overlap with the query
3. Implied meaning of the query (scene, mood, angle, pose)
4. How detailed and accurate the description is

Answer with a JSON object only:
{{
    "reranked_results": [
        {{"id": 123, "score": 0.95, "reason": "matches the query intent exactly"}},
        {{"id": 456, "score": 0.85, "reason": "partial match, still highly relevant"}}
    ],
    "filtered_count": 2
}}

Only include results with score > {floor}, at most {desired}. Scores are between 0 and 1. Use only the IDs listed above."#,
            query = query,
            listing = listing,
            floor = self.acceptance_floor,
            desired = desired,
        )
    }
}

/// Deserialize and validate the model's answer against the candidate set
///
/// Rejects: non-JSON text, missing `reranked_results`, IDs not among the
/// candidates, duplicate IDs, and scores outside [0, 1].
pub fn parse_rerank_payload(
    content: &str,
    candidates: &[RerankCandidate],
) -> Result<Vec<RerankedItem>, RerankError> {
    let payload: RerankPayload = serde_json::from_str(content.trim())
        .map_err(|e| RerankError::Malformed(format!("invalid JSON payload: {}", e)))?;

    let known: HashSet<i64> = candidates.iter().map(|c| c.entity_id).collect();
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(payload.reranked_results.len());

    for entry in payload.reranked_results {
        if !known.contains(&entry.id) {
            return Err(RerankError::Malformed(format!(
                "unknown candidate id {}",
                entry.id
            )));
        }
        if !seen.insert(entry.id) {
            return Err(RerankError::Malformed(format!(
                "duplicate candidate id {}",
                entry.id
            )));
        }
        if !entry.score.is_finite() || !(0.0..=1.0).contains(&entry.score) {
            return Err(RerankError::Malformed(format!(
                "score {} for id {} is outside [0, 1]",
                entry.score, entry.id
            )));
        }
        items.push(RerankedItem {
            entity_id: entry.id,
            score: entry.score,
            reason: entry.reason,
        });
    }

    Ok(items)
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        desired: usize,
    ) -> Result<Vec<RerankedItem>, RerankError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        if query.trim().is_empty() {
            return Err(RerankError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let prompt = self.build_prompt(query, candidates, desired);
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RerankError::Timeout(self.timeout.as_millis() as u64)
            } else {
                RerankError::RerankingError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RerankError::RerankingError(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| RerankError::Malformed(format!("chat envelope: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RerankError::Malformed("empty chat completion".to_string()))?;

        tracing::debug!("Reranker replied with {} bytes", content.len());

        parse_rerank_payload(&content, candidates)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<RerankCandidate> {
        vec![
            RerankCandidate {
                entity_id: 123,
                prior_score: 0.8,
                text: "Seated by a cafe window, soft light".to_string(),
            },
            RerankCandidate {
                entity_id: 456,
                prior_score: 0.7,
                text: "Standing on a city street at night".to_string(),
            },
        ]
    }

    #[test]
    fn test_parse_valid_payload() {
        let content = r#"{
            "reranked_results": [
                {"id": 456, "score": 0.9, "reason": "night street"},
                {"id": 123, "score": 0.65}
            ],
            "filtered_count": 2
        }"#;

        let items = parse_rerank_payload(content, &candidates()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].entity_id, 456);
        assert_eq!(items[0].reason.as_deref(), Some("night street"));
        assert_eq!(items[1].reason, None);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let result = parse_rerank_payload("Here are the results: 456, 123", &candidates());
        assert!(matches!(result, Err(RerankError::Malformed(_))));
    }

    #[test]
    fn test_parse_rejects_fenced_json() {
        let content = "```json\n{\"reranked_results\": []}\n```";
        assert!(matches!(
            parse_rerank_payload(content, &candidates()),
            Err(RerankError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_id() {
        let content = r#"{"reranked_results": [{"id": 999, "score": 0.9}]}"#;
        assert!(matches!(
            parse_rerank_payload(content, &candidates()),
            Err(RerankError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_out_of_range_score() {
        let content = r#"{"reranked_results": [{"id": 123, "score": 7.5}]}"#;
        assert!(matches!(
            parse_rerank_payload(content, &candidates()),
            Err(RerankError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_duplicates() {
        let content = r#"{"reranked_results": [{"id": 123, "score": 0.9}, {"id": 123, "score": 0.8}]}"#;
        assert!(parse_rerank_payload(content, &candidates()).is_err());
    }

    #[test]
    fn test_parse_empty_verdict_is_valid() {
        let items = parse_rerank_payload(r#"{"reranked_results": []}"#, &candidates()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_prompt_lists_candidates_and_limits() {
        let reranker = LlmReranker::new(
            "http://localhost:1",
            None,
            "gpt-4o-mini",
            Duration::from_secs(1),
        )
        .unwrap()
        .with_prompt_limits(0.6, 10);

        let prompt = reranker.build_prompt("cafe portrait", &candidates(), 5);
        assert!(prompt.contains("ID:123"));
        assert!(prompt.contains("ID:456"));
        assert!(prompt.contains("\"cafe portrait\""));
        assert!(prompt.contains("score > 0.6, at most 5"));
        // Snippets truncated to 10 chars
        assert!(prompt.contains("Content: Seated by \n"));
    }
}
