// Waypoint Core - Run state
//
// AgentState is the single mutable object threaded through a chain. It is
// created once per run, mutated by each node in turn and read by the result
// aggregator; nothing in it outlives the run.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::error::WaypointError;
use crate::flow::FlowType;

/// Cursor value before the first node runs
pub const START: &str = "start";

/// Cursor value after the terminal edge
pub const END: &str = "end";

// ============================================================================
// Ledger
// ============================================================================

/// Insertion-ordered name → value map.
///
/// Inserting a name that is already present replaces the value in place, so
/// a node can never contribute more than one entry per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger<V> {
    entries: Vec<(String, V)>,
}

impl<V> Ledger<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace; returns the previous value if there was one
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Most recently inserted entry
    pub fn last(&self) -> Option<(&str, &V)> {
        self.entries.last().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for Ledger<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(String, V)> for Ledger<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut ledger = Ledger::new();
        for (name, value) in iter {
            ledger.insert(name, value);
        }
        ledger
    }
}

impl<V: Serialize> Serialize for Ledger<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Context, validation and results
// ============================================================================

/// Per-run identity
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionContext {
    /// Unique run identifier
    pub run_id: Uuid,

    /// Name of the node currently executing
    pub node_id: String,

    /// When the run was created
    pub created_at: DateTime<Utc>,

    /// Caller-supplied metadata
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    pub fn new(metadata: HashMap<String, serde_json::Value>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            node_id: START.to_string(),
            created_at: Utc::now(),
            metadata,
        }
    }
}

/// Outcome of a node's precondition checks.
///
/// Every failed check is collected; warnings never make the result invalid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_checks(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Errors joined for a single-line message
    pub fn error_summary(&self) -> String {
        self.errors.join(", ")
    }
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmPayload {
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub tokens_estimated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathPayload {
    pub operation: String,
    pub operands: Vec<f64>,
    pub result: f64,
    pub expression: String,
}

/// Node-type-specific result data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum NodePayload {
    Search(SearchPayload),
    Llm(LlmPayload),
    Math(MathPayload),
    /// Formatted text (output step)
    Text(String),
    #[default]
    Empty,
}

/// Result of one node invocation; never mutated after it is recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResult {
    pub success: bool,

    pub data: NodePayload,

    /// Present iff `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Seconds spent in the node, up to completion or the failure point
    pub execution_time: f64,

    /// Owning run
    pub run_id: Uuid,
}

impl NodeResult {
    pub fn completed(run_id: Uuid, data: NodePayload, elapsed: Duration) -> Self {
        Self {
            success: true,
            data,
            error: None,
            execution_time: elapsed.as_secs_f64(),
            run_id,
        }
    }

    pub fn failed(run_id: Uuid, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            data: NodePayload::Empty,
            error: Some(error.into()),
            execution_time: elapsed.as_secs_f64(),
            run_id,
        }
    }
}

// ============================================================================
// Normalized input and routing
// ============================================================================

/// How the math normalizer obtained its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandSource {
    /// Parsed from an inline `a <op> b` expression
    Inline,
    /// Operation from keywords, operands from the numbers in the text
    Keywords,
    /// Fewer than two numbers found; placeholder operands substituted
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathInput {
    pub operation: String,
    pub operands: Vec<f64>,
    pub source: OperandSource,
}

/// Flow-specific structured payload derived from the raw text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum NormalizedInput {
    Search { query: String, num_results: usize },
    Llm { prompt: String, system_message: String },
    Math(MathInput),
}

impl NormalizedInput {
    pub fn flow_type(&self) -> FlowType {
        match self {
            Self::Search { .. } => FlowType::Search,
            Self::Llm { .. } => FlowType::Llm,
            Self::Math(_) => FlowType::Math,
        }
    }
}

/// Why a flow was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum RouteReason {
    /// Caller supplied the flow explicitly
    Explicit(String),
    /// A configured routing pattern matched
    Pattern(String),
    /// Nothing matched; configured default used
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub flow_type: FlowType,
    pub reason: RouteReason,
}

// ============================================================================
// AgentState
// ============================================================================

/// The run state threaded through a chain
#[derive(Debug, Clone)]
pub struct AgentState {
    pub user_input: String,
    pub flow_type: FlowType,
    pub input: NormalizedInput,
    pub current_node: String,
    pub context: ExecutionContext,
    pub node_results: Ledger<NodeResult>,
    pub final_output: Option<String>,
    pub error_message: Option<String>,
    /// Stable tag of the error behind `error_message`
    pub error_kind: Option<&'static str>,
    pub routing: RoutingDecision,
    pub validation_results: Ledger<ValidationResult>,
}

impl AgentState {
    pub fn new(
        user_input: impl Into<String>,
        routing: RoutingDecision,
        input: NormalizedInput,
        context: ExecutionContext,
    ) -> Self {
        Self {
            user_input: user_input.into(),
            flow_type: routing.flow_type,
            input,
            current_node: START.to_string(),
            context,
            node_results: Ledger::new(),
            final_output: None,
            error_message: None,
            error_kind: None,
            routing,
            validation_results: Ledger::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.context.run_id
    }

    /// Move the cursor to `node`
    pub fn advance(&mut self, node: &str) {
        self.current_node = node.to_string();
        self.context.node_id = node.to_string();
    }

    pub fn record_result(&mut self, name: &str, result: NodeResult) {
        if self.node_results.insert(name, result).is_some() {
            tracing::warn!(node = name, "node result recorded twice in one run; replaced");
        }
    }

    pub fn record_validation(&mut self, name: &str, validation: ValidationResult) {
        self.validation_results.insert(name, validation);
    }

    /// Set the run-level error; the first error wins
    pub fn fail(&mut self, err: &WaypointError) {
        if self.error_message.is_none() {
            self.error_message = Some(err.to_string());
            self.error_kind = Some(err.kind());
        }
    }

    /// Whether the chain must stop
    pub fn is_halted(&self) -> bool {
        self.error_message.is_some()
    }

    /// Sum of every recorded node duration
    pub fn total_execution_time(&self) -> f64 {
        self.node_results.values().map(|r| r.execution_time).sum()
    }
}
