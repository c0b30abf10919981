//! Waypoint Nodes - Concrete processing steps
//!
//! - `SearchNode`: web search (Serper)
//! - `LlmNode`: chat completion (Gemini)
//! - `MathNode`: arithmetic over parsed operands
//! - `OutputNode`: formats the upstream result as the final output

pub mod llm;
pub mod math;
pub mod output;
pub mod search;

use std::sync::Arc;

use waypoint_core::{NodeRegistry, NodeSettings, WaypointResult};

pub use llm::LlmNode;
pub use math::{format_number, MathNode};
pub use output::OutputNode;
pub use search::SearchNode;

/// API keys for the nodes that call external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub search: Option<String>,
    pub llm: Option<String>,
}

impl ApiKeys {
    /// Read keys from the environment variables named in the settings
    pub fn from_env(settings: &NodeSettings) -> Self {
        Self {
            search: std::env::var(&settings.search.api_key_env).ok(),
            llm: std::env::var(&settings.llm.api_key_env).ok(),
        }
    }
}

/// Registry with every built-in node
pub fn default_registry(settings: &NodeSettings, keys: ApiKeys) -> WaypointResult<NodeRegistry> {
    let mut registry = NodeRegistry::new();
    registry
        .register(Arc::new(SearchNode::new(&settings.search, keys.search)?))
        .register(Arc::new(LlmNode::new(&settings.llm, keys.llm)?))
        .register(Arc::new(MathNode::new()))
        .register(Arc::new(OutputNode::new()));
    Ok(registry)
}
