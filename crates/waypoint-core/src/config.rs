// Waypoint Core - Flow configuration document
//
// The configuration file supplies every flow (ordered), the routing default,
// engine limits and per-node settings. Structural validation happens here;
// node types are only resolved when chains are compiled.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{WaypointError, WaypointResult};
use crate::flow::{FlowSpec, FlowType};

/// Default lead-in for the LLM system message
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful AI assistant.";

/// Default number of search results requested
pub const DEFAULT_NUM_RESULTS: usize = 5;

/// Default step guard for the execution engine
pub const DEFAULT_MAX_STEPS: usize = 32;

/// Root of the flow configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowsConfig {
    /// Configured flows; list order is routing scan order
    pub flows: Vec<FlowSpec>,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub nodes: NodeSettings,
}

/// Routing behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Flow used when no pattern matches
    #[serde(default = "default_flow")]
    pub default: FlowType,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default: default_flow(),
        }
    }
}

fn default_flow() -> FlowType {
    FlowType::Llm
}

/// Execution engine limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum node invocations per run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

/// Settings for the concrete node implementations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSettings {
    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub llm: LlmSettings,
}

/// Web search node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSettings {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_num_results")]
    pub num_results: usize,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Environment variable holding the API key
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            num_results: default_num_results(),
            timeout_secs: default_search_timeout(),
            api_key_env: default_search_key_env(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".to_string()
}

fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}

fn default_search_timeout() -> u64 {
    30
}

fn default_search_key_env() -> String {
    "SERPER_API_KEY".to_string()
}

/// Chat-completion node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    /// Base URL of the generative language API
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_system_message")]
    pub system_message: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
            api_key_env: default_llm_key_env(),
            system_message: default_system_message(),
        }
    }
}

fn default_llm_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_llm_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_system_message() -> String {
    DEFAULT_SYSTEM_MESSAGE.to_string()
}

impl FlowsConfig {
    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> WaypointResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WaypointError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            WaypointError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&content)
            .map_err(|e| WaypointError::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate a configuration document
    pub fn from_yaml(content: &str) -> WaypointResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(content);
        let config: FlowsConfig = serde_path_to_error::deserialize(deserializer).map_err(|e| {
            let path = e.path().to_string();
            WaypointError::config(format!("Invalid configuration at '{}': {}", path, e.inner()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check the structural rules across all flows
    pub fn validate(&self) -> WaypointResult<()> {
        if self.flows.is_empty() {
            return Err(WaypointError::config("At least one flow is required"));
        }

        let mut seen = HashSet::new();
        for flow in &self.flows {
            if !seen.insert(flow.id) {
                return Err(WaypointError::config(format!(
                    "Duplicate flow id: {}",
                    flow.id
                )));
            }
            flow.validate().map_err(WaypointError::Config)?;
        }

        if !seen.contains(&self.routing.default) {
            return Err(WaypointError::config(format!(
                "Default flow '{}' is not configured",
                self.routing.default
            )));
        }

        if self.engine.max_steps == 0 {
            return Err(WaypointError::config("engine.maxSteps must be at least 1"));
        }

        Ok(())
    }

    /// Look up the flow configured for a flow type
    pub fn flow(&self, flow_type: FlowType) -> Option<&FlowSpec> {
        self.flows.iter().find(|f| f.id == flow_type)
    }
}
