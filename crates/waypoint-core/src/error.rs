// Waypoint Core - Error taxonomy
//
// Node-local failures (validation, external calls) never escape a node; they
// are converted into NodeResult data. Only configuration/compile errors and
// unexpected failures reach the outer boundary, where the agent turns them
// into a failed envelope.

use thiserror::Error;

/// Result alias used across the waypoint crates
pub type WaypointResult<T> = Result<T, WaypointError>;

/// Errors raised by routing, compilation and node execution
#[derive(Debug, Error)]
pub enum WaypointError {
    /// Malformed or missing flow configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Explicit flow override that is not a known flow type
    #[error("Unknown flow type: {0}")]
    UnknownFlow(String),

    /// Normalizer asked to handle a flow type it has no strategy for
    #[error("Unknown flow type for input normalization: {0}")]
    UnknownFlowType(String),

    /// Configuration references a node type with no registered implementation
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// A node's precondition check failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Network / non-2xx / decode failure from a collaborator API
    #[error("External call failed: {0}")]
    ExternalCall(String),

    /// A bounded operation exceeded its deadline
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// Result shaping failed
    #[error("Formatting error: {0}")]
    Formatting(String),

    /// Step guard tripped (misconfigured cyclic chain)
    #[error("Maximum step count exceeded: {0}")]
    MaxStepsExceeded(usize),

    /// Run was cancelled between node transitions
    #[error("execution cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WaypointError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalCall(msg.into())
    }

    pub fn formatting(msg: impl Into<String>) -> Self {
        Self::Formatting(msg.into())
    }

    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Stable snake-case tag for logs and envelopes
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Io(_) | Self::Yaml(_) => "config_error",
            Self::UnknownFlow(_) => "unknown_flow",
            Self::UnknownFlowType(_) => "unknown_flow_type",
            Self::UnknownNodeType(_) => "unknown_node_type",
            Self::Validation(_) => "validation_error",
            Self::ExternalCall(_) | Self::Timeout { .. } | Self::Json(_) => "external_call_error",
            Self::Formatting(_) => "formatting_error",
            Self::MaxStepsExceeded(_) => "max_steps_exceeded",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this error is fatal at startup rather than per-run
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::UnknownNodeType(_) | Self::Io(_) | Self::Yaml(_)
        )
    }
}
