//! Waypoint Runtime - Routing and execution for waypoint flows
//!
//! Pipeline for a single request:
//! router → input normalizer → compiled chain on the execution engine →
//! result aggregator. `Agent` wires these together.

pub mod agent;
pub mod aggregator;
pub mod engine;
pub mod graph;
pub mod normalizer;
pub mod router;

pub use agent::{Agent, Metadata};
pub use aggregator::{aggregate, NodeSummary, ResultEnvelope, NO_OUTPUT, UNKNOWN_FLOW};
pub use engine::{EngineEvent, ExecutionEngine};
pub use graph::{ChainStep, ExecutableChain, GraphBuilder, Transition};
pub use normalizer::{parse_math, InputNormalizer, FALLBACK_OPERANDS, SEARCH_LEAD_INS};
pub use router::FlowRouter;

// Re-export the cancellation token used by `ExecutionEngine::run`
pub use tokio_util::sync::CancellationToken;
