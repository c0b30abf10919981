//! Search Node
//!
//! Web search through the Serper API.
//!
//! ## Prerequisites
//!
//! - An API key, read from the environment variable named by
//!   `nodes.search.apiKeyEnv` (default `SERPER_API_KEY`)
//!
//! A missing key is reported as a validation error when the node runs, so
//! flows that never search work without one.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use waypoint_core::{
    AgentState, Node, NodePayload, NodeType, NormalizedInput, SearchHit, SearchPayload,
    SearchSettings, ValidationResult, WaypointError, WaypointResult,
};

/// Most hits kept in the payload
pub const MAX_HITS: usize = 5;

/// Queries longer than this produce a warning
pub const MAX_QUERY_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperHit>,
    #[serde(default, rename = "searchParameters")]
    search_parameters: Option<SearchParameters>,
}

#[derive(Debug, Deserialize)]
struct SerperHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchParameters {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Clone)]
pub struct SearchNode {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
    timeout_secs: u64,
}

impl SearchNode {
    pub fn new(settings: &SearchSettings, api_key: Option<String>) -> WaypointResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| WaypointError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_key_env: settings.api_key_env.clone(),
            timeout_secs: settings.timeout_secs,
        })
    }

    fn input(state: &AgentState) -> Option<(&str, usize)> {
        match &state.input {
            NormalizedInput::Search { query, num_results } => Some((query.as_str(), *num_results)),
            _ => None,
        }
    }

    async fn search(
        &self,
        api_key: &str,
        query: &str,
        num: usize,
    ) -> WaypointResult<SearchPayload> {
        debug!(endpoint = %self.endpoint, query, num, "Sending search request");

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({ "q": query, "num": num }))
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WaypointError::external(format!(
                "Search API returned {}: {}",
                status, body
            )));
        }

        let body: SerperResponse = response
            .json()
            .await
            .map_err(|e| WaypointError::external(format!("Invalid search response: {}", e)))?;

        Ok(SearchPayload {
            query: body.search_parameters.map(|p| p.q).unwrap_or_default(),
            total_results: body.organic.len(),
            results: body
                .organic
                .into_iter()
                .take(MAX_HITS)
                .map(|hit| SearchHit {
                    title: hit.title,
                    link: hit.link,
                    snippet: hit.snippet,
                })
                .collect(),
        })
    }

    fn request_error(&self, err: reqwest::Error) -> WaypointError {
        if err.is_timeout() {
            WaypointError::timeout("Search request", self.timeout_secs)
        } else {
            WaypointError::external(format!("Search request failed: {}", err))
        }
    }
}

#[async_trait]
impl Node for SearchNode {
    fn node_type(&self) -> NodeType {
        NodeType::SearchNode
    }

    fn validate(&self, state: &AgentState) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match Self::input(state) {
            Some((query, _)) if query.trim().is_empty() => {
                errors.push("Search query cannot be empty".to_string())
            }
            Some((query, _)) if query.chars().count() > MAX_QUERY_CHARS => {
                warnings.push("Query is very long, results may be limited".to_string())
            }
            Some(_) => {}
            None => errors.push(format!("Search node cannot handle {} input", state.flow_type)),
        }

        if self.api_key.is_none() {
            errors.push(format!("Search API key is not set ({})", self.api_key_env));
        }

        ValidationResult::from_checks(errors, warnings)
    }

    async fn process(&self, state: &AgentState) -> WaypointResult<NodePayload> {
        let (query, num) = Self::input(state)
            .ok_or_else(|| WaypointError::validation("Search input is required"))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| WaypointError::validation("Search API key is not set"))?;

        self.search(api_key, query, num).await.map(NodePayload::Search)
    }
}
