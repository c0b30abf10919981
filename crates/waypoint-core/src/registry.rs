// Waypoint Core - Flow Registry
//
// Holds every configured flow keyed by flow type, in configuration order.
// Built once from a validated configuration and read-only afterwards; the
// router scans it for patterns and the graph builder compiles from it.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::FlowsConfig;
use crate::error::WaypointResult;
use crate::flow::{FlowSpec, FlowType};

/// Ordered, immutable set of configured flows
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: Vec<Arc<FlowSpec>>,
}

impl FlowRegistry {
    /// Build from an already validated configuration
    pub fn from_config(config: &FlowsConfig) -> Self {
        let flows: Vec<Arc<FlowSpec>> = config
            .flows
            .iter()
            .map(|flow| {
                debug!(flow = %flow.id, nodes = flow.nodes.len(), "registered flow");
                Arc::new(flow.clone())
            })
            .collect();

        info!("Loaded {} flows", flows.len());
        Self { flows }
    }

    /// Load, validate and register flows from a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> WaypointResult<Self> {
        let config = FlowsConfig::from_file(path)?;
        Ok(Self::from_config(&config))
    }

    /// Get a flow by type
    pub fn get(&self, flow_type: FlowType) -> Option<Arc<FlowSpec>> {
        self.flows.iter().find(|f| f.id == flow_type).cloned()
    }

    /// Flow types in configuration order
    pub fn list(&self) -> Vec<FlowType> {
        self.flows.iter().map(|f| f.id).collect()
    }

    /// All flows in configuration order
    pub fn all(&self) -> &[Arc<FlowSpec>] {
        &self.flows
    }

    /// Routing table: each flow with its pattern list, in scan order
    pub fn patterns(&self) -> impl Iterator<Item = (FlowType, &[String])> {
        self.flows.iter().map(|f| (f.id, f.patterns.as_slice()))
    }

    pub fn contains(&self, flow_type: FlowType) -> bool {
        self.flows.iter().any(|f| f.id == flow_type)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FLOWS: &str = r#"
flows:
  - id: math
    name: Math Flow
    patterns: [calculate]
    nodes:
      - name: math
        type: MathNode
        next: output
      - name: output
        type: OutputNode
  - id: llm
    name: LLM Flow
    nodes:
      - name: llm
        type: LLMNode
"#;

    #[test]
    fn test_registry_keeps_config_order() {
        let config = FlowsConfig::from_yaml(TWO_FLOWS).unwrap();
        let registry = FlowRegistry::from_config(&config);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list(), vec![FlowType::Math, FlowType::Llm]);
        assert!(registry.contains(FlowType::Llm));
        assert!(!registry.contains(FlowType::Search));
        assert!(registry.get(FlowType::Search).is_none());
        assert_eq!(registry.get(FlowType::Math).unwrap().name, "Math Flow");
    }

    #[test]
    fn test_patterns_table() {
        let config = FlowsConfig::from_yaml(TWO_FLOWS).unwrap();
        let registry = FlowRegistry::from_config(&config);

        let table: Vec<_> = registry.patterns().collect();
        assert_eq!(table[0].0, FlowType::Math);
        assert_eq!(table[0].1, ["calculate".to_string()]);
        assert!(table[1].1.is_empty());
    }
}
