//! GraphBuilder - Compiles configured flows into executable chains
//!
//! Each node spec is bound to its shared implementation from the node
//! registry, its successor edge is wired, and a node without `next` gets
//! the terminal transition. The entry point is the first configured node.
//! Chains are compiled once at startup and never change afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use waypoint_core::{
    FlowRegistry, FlowSpec, FlowType, Node, NodeRegistry, NodeType, WaypointError, WaypointResult,
};

/// Edge leaving a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Continue at the named step
    Node(String),
    /// Terminal marker
    End,
}

/// A bound step of a compiled chain
#[derive(Clone)]
pub struct ChainStep {
    pub node: Arc<dyn Node>,
    pub node_type: NodeType,
    pub next: Transition,
}

impl fmt::Debug for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainStep")
            .field("node_type", &self.node_type)
            .field("next", &self.next)
            .finish()
    }
}

/// Immutable, compiled form of a flow
#[derive(Debug, Clone)]
pub struct ExecutableChain {
    flow: FlowType,
    entry: String,
    steps: HashMap<String, ChainStep>,
    /// Configured node order, for listing
    declared: Vec<String>,
}

impl ExecutableChain {
    pub fn flow(&self) -> FlowType {
        self.flow
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn step(&self, name: &str) -> Option<&ChainStep> {
        self.steps.get(name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Node names in configured order
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    /// Names visited by following edges from the entry, stopping at the
    /// terminal marker. A cycle is cut after every step has been seen once.
    pub fn visit_order(&self) -> Vec<String> {
        let mut order = Vec::new();
        let mut cursor = Transition::Node(self.entry.clone());

        while let Transition::Node(name) = cursor {
            if order.len() > self.steps.len() || order.contains(&name) {
                break;
            }
            let Some(step) = self.steps.get(&name) else {
                break;
            };
            cursor = step.next.clone();
            order.push(name);
        }

        order
    }

    /// Edges in visit order, ending with the terminal transition
    pub fn edges(&self) -> Vec<(String, NodeType, Transition)> {
        self.visit_order()
            .into_iter()
            .filter_map(|name| {
                self.steps
                    .get(&name)
                    .map(|s| (name.clone(), s.node_type, s.next.clone()))
            })
            .collect()
    }
}

/// Binds flow specs to node implementations
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    nodes: NodeRegistry,
}

impl GraphBuilder {
    pub fn new(nodes: NodeRegistry) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    /// Compile one flow
    pub fn compile(&self, flow: &FlowSpec) -> WaypointResult<ExecutableChain> {
        flow.validate().map_err(WaypointError::Config)?;

        let entry = flow
            .entry()
            .map(|n| n.name.clone())
            .ok_or_else(|| WaypointError::config(format!("Flow '{}' has no nodes", flow.id)))?;

        let mut steps = HashMap::with_capacity(flow.nodes.len());
        for spec in &flow.nodes {
            let node = self.nodes.resolve(&spec.node_type)?;
            let next = match &spec.next {
                Some(next) => Transition::Node(next.clone()),
                None => Transition::End,
            };
            debug!(flow = %flow.id, node = %spec.name, node_type = %node.node_type(), "bound step");
            steps.insert(
                spec.name.clone(),
                ChainStep {
                    node_type: node.node_type(),
                    node,
                    next,
                },
            );
        }

        Ok(ExecutableChain {
            flow: flow.id,
            entry,
            steps,
            declared: flow.nodes.iter().map(|n| n.name.clone()).collect(),
        })
    }

    /// Compile every registered flow
    pub fn compile_all(
        &self,
        registry: &FlowRegistry,
    ) -> WaypointResult<HashMap<FlowType, Arc<ExecutableChain>>> {
        registry
            .all()
            .iter()
            .map(|flow| Ok((flow.id, Arc::new(self.compile(flow)?))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use waypoint_core::{AgentState, NodePayload, NodeSpec};

    struct Noop(NodeType);

    #[async_trait]
    impl Node for Noop {
        fn node_type(&self) -> NodeType {
            self.0
        }

        async fn process(&self, _state: &AgentState) -> WaypointResult<NodePayload> {
            Ok(NodePayload::Empty)
        }
    }

    fn builder() -> GraphBuilder {
        let mut nodes = NodeRegistry::new();
        nodes
            .register(Arc::new(Noop(NodeType::MathNode)))
            .register(Arc::new(Noop(NodeType::OutputNode)));
        GraphBuilder::new(nodes)
    }

    fn flow(nodes: Vec<NodeSpec>) -> FlowSpec {
        FlowSpec {
            id: FlowType::Math,
            name: "Math".to_string(),
            description: String::new(),
            tags: vec![],
            patterns: vec![],
            nodes,
        }
    }

    #[test]
    fn test_compile_linear_chain() {
        let chain = builder()
            .compile(&flow(vec![
                NodeSpec::new("parse", NodeType::MathNode, Some("format")),
                NodeSpec::new("format", NodeType::OutputNode, None),
            ]))
            .unwrap();

        assert_eq!(chain.flow(), FlowType::Math);
        assert_eq!(chain.entry(), "parse");
        assert_eq!(chain.visit_order(), vec!["parse", "format"]);
        assert_eq!(chain.visit_order(), chain.declared().to_vec());
        assert_eq!(chain.step("format").unwrap().next, Transition::End);
        assert_eq!(
            chain.step("parse").unwrap().next,
            Transition::Node("format".to_string())
        );
    }

    #[test]
    fn test_unregistered_node_type() {
        let err = builder()
            .compile(&flow(vec![NodeSpec::new("s", NodeType::SearchNode, None)]))
            .unwrap_err();
        assert!(matches!(err, WaypointError::UnknownNodeType(ref t) if t == "SearchNode"));
    }

    #[test]
    fn test_unknown_type_string() {
        let mut spec = flow(vec![NodeSpec::new("m", NodeType::MathNode, None)]);
        spec.nodes[0].node_type = "AbacusNode".to_string();
        let err = builder().compile(&spec).unwrap_err();
        assert_eq!(err.to_string(), "Unknown node type: AbacusNode");
    }

    #[test]
    fn test_cycle_is_cut_in_visit_order() {
        let chain = builder()
            .compile(&flow(vec![
                NodeSpec::new("a", NodeType::MathNode, Some("b")),
                NodeSpec::new("b", NodeType::OutputNode, Some("a")),
            ]))
            .unwrap();
        assert_eq!(chain.visit_order(), vec!["a", "b"]);
    }
}
