// Waypoint Core - Node capability
//
// Every processing step implements `Node`. The provided `execute` method is
// the step protocol: move the cursor, validate, record the validation
// result, run the work, record exactly one NodeResult, and report whether
// the chain may continue. Node-local failures never escape as errors; they
// become NodeResult data plus the run-level error message.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::error::{WaypointError, WaypointResult};
use crate::flow::NodeType;
use crate::state::{AgentState, NodePayload, NodeResult, ValidationResult};

/// Discriminant returned by a step; the engine inspects only this
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Follow the successor edge
    Continue,
    /// Stop the chain; `error_message` is set
    Halt,
}

/// A single typed processing step.
///
/// Instances are built once and shared by every run, so implementations must
/// not hold per-run mutable state.
#[async_trait]
pub trait Node: Send + Sync {
    /// Registry key for this implementation
    fn node_type(&self) -> NodeType;

    /// Precondition checks against the run state
    fn validate(&self, _state: &AgentState) -> ValidationResult {
        ValidationResult::valid()
    }

    /// The node's work. Errors are converted by `execute`.
    async fn process(&self, state: &AgentState) -> WaypointResult<NodePayload>;

    /// Run this node as step `name` of the chain
    async fn execute(&self, name: &str, state: &mut AgentState) -> StepOutcome {
        state.advance(name);
        let run_id = state.run_id();
        let start = Instant::now();

        let validation = self.validate(state);
        for warning in &validation.warnings {
            warn!(node = name, "{}", warning);
        }
        state.record_validation(name, validation.clone());

        if !validation.is_valid {
            let err = WaypointError::validation(validation.error_summary());
            error!(node = name, kind = err.kind(), "{}", err);
            let failed = NodeResult::failed(run_id, err.to_string(), start.elapsed());
            state.record_result(name, failed);
            state.fail(&err);
            return StepOutcome::Halt;
        }

        match self.process(state).await {
            Ok(payload) => {
                let result = NodeResult::completed(run_id, payload, start.elapsed());
                debug!(node = name, elapsed = result.execution_time, "node completed");
                state.record_result(name, result);
            }
            Err(err) => {
                error!(node = name, kind = err.kind(), "{}", err);
                state.record_result(
                    name,
                    NodeResult::failed(run_id, err.to_string(), start.elapsed()),
                );
                state.fail(&err);
            }
        }

        if state.is_halted() {
            StepOutcome::Halt
        } else {
            StepOutcome::Continue
        }
    }
}

/// Typed lookup from node kind to its shared implementation
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeType, Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation under its own node type, replacing any
    /// previous one
    pub fn register(&mut self, node: Arc<dyn Node>) -> &mut Self {
        self.nodes.insert(node.node_type(), node);
        self
    }

    pub fn get(&self, node_type: NodeType) -> Option<Arc<dyn Node>> {
        self.nodes.get(&node_type).cloned()
    }

    /// Resolve a configured type string to an implementation
    pub fn resolve(&self, type_name: &str) -> WaypointResult<Arc<dyn Node>> {
        let node_type: NodeType = type_name.parse()?;
        self.get(node_type)
            .ok_or_else(|| WaypointError::UnknownNodeType(type_name.to_string()))
    }

    pub fn contains(&self, node_type: NodeType) -> bool {
        self.nodes.contains_key(&node_type)
    }

    /// Registered node types in declaration order
    pub fn types(&self) -> Vec<NodeType> {
        NodeType::ALL
            .into_iter()
            .filter(|t| self.nodes.contains_key(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.types())
            .finish()
    }
}
