//! Result aggregation - Reduces a finished run into the response envelope
//!
//! Every run, successful or not, produces the same envelope shape.

use serde::Serialize;
use uuid::Uuid;

use waypoint_core::{AgentState, Ledger, RoutingDecision, ValidationResult, WaypointError};

/// Output used when no step produced a final output
pub const NO_OUTPUT: &str = "No output generated";

/// Flow name reported when a run fails before a flow was resolved
pub const UNKNOWN_FLOW: &str = "unknown";

/// Per-node summary carried in the envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub success: bool,
    pub execution_time: f64,
    pub error: Option<String>,
}

/// Uniform response for a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub output: String,
    pub flow_used: String,
    /// Sum of recorded node durations, in seconds
    pub execution_time: f64,
    pub node_results: Ledger<NodeSummary>,
    pub validation_results: Ledger<ValidationResult>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingDecision>,
}

impl ResultEnvelope {
    /// Envelope for a failure that escaped routing, normalization or
    /// execution
    pub fn boundary_failure(err: &WaypointError, explicit_flow: Option<&str>) -> Self {
        let message = err.to_string();
        Self {
            success: false,
            output: format!("Agent execution failed: {}", message),
            flow_used: explicit_flow
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(UNKNOWN_FLOW)
                .to_string(),
            execution_time: 0.0,
            node_results: Ledger::new(),
            validation_results: Ledger::new(),
            error: Some(message),
            error_kind: Some(err.kind().to_string()),
            run_id: None,
            routing: None,
        }
    }
}

/// Reduce the final run state into an envelope
pub fn aggregate(state: &AgentState) -> ResultEnvelope {
    let node_results = state
        .node_results
        .iter()
        .map(|(name, result)| {
            (
                name.to_string(),
                NodeSummary {
                    success: result.success,
                    execution_time: result.execution_time,
                    error: result.error.clone(),
                },
            )
        })
        .collect();

    ResultEnvelope {
        success: state.error_message.is_none(),
        output: state
            .final_output
            .clone()
            .unwrap_or_else(|| NO_OUTPUT.to_string()),
        flow_used: state.flow_type.to_string(),
        execution_time: state.total_execution_time(),
        node_results,
        validation_results: state.validation_results.clone(),
        error: state.error_message.clone(),
        error_kind: state.error_kind.map(str::to_string),
        run_id: Some(state.run_id()),
        routing: Some(state.routing.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;
    use waypoint_core::{
        ExecutionContext, FlowType, MathInput, NodePayload, NodeResult, NormalizedInput,
        OperandSource, RouteReason,
    };

    fn state() -> AgentState {
        AgentState::new(
            "2+2",
            RoutingDecision {
                flow_type: FlowType::Math,
                reason: RouteReason::Pattern("+".to_string()),
            },
            NormalizedInput::Math(MathInput {
                operation: "add".to_string(),
                operands: vec![2.0, 2.0],
                source: OperandSource::Inline,
            }),
            ExecutionContext::new(HashMap::new()),
        )
    }

    #[test]
    fn test_empty_run() {
        let envelope = aggregate(&state());
        assert!(envelope.success);
        assert_eq!(envelope.output, NO_OUTPUT);
        assert_eq!(envelope.flow_used, "math");
        assert_eq!(envelope.execution_time, 0.0);
        assert!(envelope.node_results.is_empty());
    }

    #[test]
    fn test_execution_time_is_sum_of_nodes() {
        let mut state = state();
        let run_id = state.run_id();
        let durations = [120u64, 30, 850];
        for (i, ms) in durations.iter().enumerate() {
            state.record_result(
                &format!("n{}", i),
                NodeResult::completed(run_id, NodePayload::Empty, Duration::from_millis(*ms)),
            );
        }

        let envelope = aggregate(&state);
        let expected: f64 = state.node_results.values().map(|r| r.execution_time).sum();
        assert!((envelope.execution_time - expected).abs() < 1e-12);
        assert!((envelope.execution_time - 1.0).abs() < 1e-9);
        let names: Vec<_> = envelope.node_results.names().collect();
        assert_eq!(names, vec!["n0", "n1", "n2"]);
    }

    #[test]
    fn test_failed_run() {
        let mut state = state();
        let run_id = state.run_id();
        let err = WaypointError::validation("Division by zero is not allowed");
        state.record_result("math", NodeResult::failed(run_id, err.to_string(), Duration::ZERO));
        state.fail(&err);

        let envelope = aggregate(&state);
        assert!(!envelope.success);
        assert_eq!(
            envelope.error.as_deref(),
            Some("Validation failed: Division by zero is not allowed")
        );
        assert_eq!(envelope.error_kind.as_deref(), Some("validation_error"));
        let summary = envelope.node_results.get("math").unwrap();
        assert!(!summary.success);
        assert_eq!(summary.error, envelope.error);
    }

    #[test]
    fn test_boundary_failure_envelope() {
        let err = WaypointError::UnknownFlow("weather".to_string());
        let envelope = ResultEnvelope::boundary_failure(&err, Some("weather"));
        assert!(!envelope.success);
        assert_eq!(envelope.flow_used, "weather");
        assert_eq!(envelope.output, "Agent execution failed: Unknown flow type: weather");
        assert!(envelope.run_id.is_none());

        let envelope = ResultEnvelope::boundary_failure(&WaypointError::config("bad"), None);
        assert_eq!(envelope.flow_used, UNKNOWN_FLOW);
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope = aggregate(&state());
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["flow_used"], serde_json::json!("math"));
        assert!(json["node_results"].is_object());
        assert!(json["error"].is_null());
        assert!(json.get("error_kind").is_none());
    }
}
