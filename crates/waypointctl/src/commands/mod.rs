pub mod flows;
pub mod interactive;
pub mod run;
pub mod selftest;
pub mod visualize;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use waypoint_core::FlowsConfig;
use waypoint_nodes::{default_registry, ApiKeys};
use waypoint_runtime::{Agent, Metadata};

/// Load and validate the flow configuration
pub fn load_config(path: &str) -> Result<FlowsConfig> {
    FlowsConfig::from_file(path)
        .with_context(|| format!("Failed to load flow configuration from {}", path))
}

/// Build an agent from the configuration file
pub fn build_agent(path: &str) -> Result<Agent> {
    let config = load_config(path)?;
    compile(&config).with_context(|| format!("Failed to compile flows from {}", path))
}

/// Create the built-in nodes, with API keys taken from the environment, and
/// compile every configured flow
pub fn compile(config: &FlowsConfig) -> Result<Agent> {
    let keys = ApiKeys::from_env(&config.nodes);
    debug!(
        search_key = keys.search.is_some(),
        llm_key = keys.llm.is_some(),
        "Resolved API keys"
    );

    let nodes = default_registry(&config.nodes, keys).context("Failed to create nodes")?;
    Ok(Agent::new(config, nodes)?)
}

/// Metadata attached to every run started from the CLI
pub fn cli_metadata(command: &str) -> Metadata {
    Metadata::from([
        ("source".to_string(), serde_json::json!("waypointctl")),
        ("command".to_string(), serde_json::json!(command)),
    ])
}

/// Cancel in-flight runs on Ctrl-C. Abort the handle once the work is done.
pub fn cancel_on_interrupt(agent: Arc<Agent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let cancelled = agent.cancel_all();
            warn!(cancelled, "Interrupted, cancelling in-flight runs");
        }
    })
}
