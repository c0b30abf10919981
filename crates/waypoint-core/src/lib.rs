// Waypoint Core - Foundation types for the waypoint flow router
//
// This crate holds the data model shared by the runtime, the node
// implementations and the command-line tool: flows, run state, the error
// taxonomy, configuration loading and the `Node` capability.

pub mod config;
pub mod error;
pub mod flow;
pub mod node;
pub mod registry;
pub mod state;

pub use config::{
    EngineConfig, FlowsConfig, LlmSettings, NodeSettings, RoutingConfig, SearchSettings,
    DEFAULT_MAX_STEPS, DEFAULT_NUM_RESULTS, DEFAULT_SYSTEM_MESSAGE,
};
pub use error::{WaypointError, WaypointResult};
pub use flow::{FlowSpec, FlowType, NodeSpec, NodeType};
pub use node::{Node, NodeRegistry, StepOutcome};
pub use registry::FlowRegistry;
pub use state::{
    AgentState, ExecutionContext, Ledger, LlmPayload, MathInput, MathPayload, NodePayload,
    NodeResult, NormalizedInput, OperandSource, RouteReason, RoutingDecision, SearchHit,
    SearchPayload, ValidationResult, END, START,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
