//! LLM Node
//!
//! Single-turn chat completion through the Gemini `generateContent` API.
//! The system message, when present, is folded into the prompt as
//! `System: ...\n\nUser: ...`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use waypoint_core::{
    AgentState, LlmPayload, LlmSettings, Node, NodePayload, NodeType, NormalizedInput,
    ValidationResult, WaypointError, WaypointResult,
};

/// Prompts longer than this produce a warning
pub const MAX_PROMPT_CHARS: usize = 10_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Combine system message and prompt into the text sent to the model
pub fn compose_prompt(system_message: &str, prompt: &str) -> String {
    if system_message.trim().is_empty() {
        prompt.to_string()
    } else {
        format!("System: {}\n\nUser: {}", system_message, prompt)
    }
}

/// Rough token estimate: whitespace-separated words in prompt and response
pub fn estimate_tokens(prompt: &str, response: &str) -> usize {
    prompt.split_whitespace().count() + response.split_whitespace().count()
}

#[derive(Debug, Clone)]
pub struct LlmNode {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    api_key_env: String,
    timeout_secs: u64,
}

impl LlmNode {
    pub fn new(settings: &LlmSettings, api_key: Option<String>) -> WaypointResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| WaypointError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_key_env: settings.api_key_env.clone(),
            timeout_secs: settings.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn input(state: &AgentState) -> Option<(&str, &str)> {
        match &state.input {
            NormalizedInput::Llm {
                prompt,
                system_message,
            } => Some((prompt.as_str(), system_message.as_str())),
            _ => None,
        }
    }

    async fn generate(&self, api_key: &str, text: String) -> WaypointResult<String> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, "Sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WaypointError::external(format!(
                "LLM API returned {}: {}",
                status, body
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| WaypointError::external(format!("Invalid LLM response: {}", e)))?;

        let content = body
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .ok_or_else(|| WaypointError::external("LLM response contained no candidates"))?;

        Ok(content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }

    fn request_error(&self, err: reqwest::Error) -> WaypointError {
        if err.is_timeout() {
            WaypointError::timeout("LLM request", self.timeout_secs)
        } else {
            WaypointError::external(format!("LLM request failed: {}", err))
        }
    }
}

#[async_trait]
impl Node for LlmNode {
    fn node_type(&self) -> NodeType {
        NodeType::LlmNode
    }

    fn validate(&self, state: &AgentState) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match Self::input(state) {
            Some((prompt, _)) if prompt.trim().is_empty() => {
                errors.push("Prompt cannot be empty".to_string())
            }
            Some((prompt, _)) if prompt.chars().count() > MAX_PROMPT_CHARS => {
                warnings.push("Prompt is very long, response may be truncated".to_string())
            }
            Some(_) => {}
            None => errors.push(format!("LLM node cannot handle {} input", state.flow_type)),
        }

        if self.api_key.is_none() {
            errors.push(format!("LLM API key is not set ({})", self.api_key_env));
        }

        ValidationResult::from_checks(errors, warnings)
    }

    async fn process(&self, state: &AgentState) -> WaypointResult<NodePayload> {
        let (prompt, system_message) = Self::input(state)
            .ok_or_else(|| WaypointError::validation("LLM input is required"))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| WaypointError::validation("LLM API key is not set"))?;

        let response = self
            .generate(api_key, compose_prompt(system_message, prompt))
            .await?;

        Ok(NodePayload::Llm(LlmPayload {
            prompt: prompt.to_string(),
            tokens_estimated: estimate_tokens(prompt, &response),
            response,
            model: self.model.clone(),
        }))
    }
}
