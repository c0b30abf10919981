//! End-to-end tests for the Agent pipeline using the built-in nodes

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use uuid::Uuid;
use waypoint_core::{
    AgentState, FlowType, FlowsConfig, Node, NodePayload, NodeRegistry, NodeType, RouteReason,
    WaypointError, WaypointResult,
};
use waypoint_nodes::{default_registry, ApiKeys};
use waypoint_runtime::{Agent, EngineEvent, Transition, NO_OUTPUT};

const CONFIG: &str = r#"
flows:
  - id: search
    name: Search Flow
    description: Web search
    patterns: [search for, find information about, look up, google]
    nodes:
      - name: search
        type: SearchNode
        next: output
      - name: output
        type: OutputNode
  - id: math
    name: Math Flow
    description: Arithmetic
    patterns: [calculate, compute, add, subtract, multiply, divide, "+", "*", "/"]
    nodes:
      - name: math
        type: MathNode
        next: output
      - name: output
        type: OutputNode
  - id: llm
    name: LLM Flow
    description: Chat
    patterns: [explain, what is]
    nodes:
      - name: llm
        type: LLMNode
        next: output
      - name: output
        type: OutputNode
routing:
  default: llm
"#;

fn config() -> FlowsConfig {
    FlowsConfig::from_yaml(CONFIG).unwrap()
}

fn agent() -> Agent {
    let config = config();
    let nodes = default_registry(&config.nodes, ApiKeys::default()).unwrap();
    Agent::new(&config, nodes).unwrap()
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn test_chain_order_matches_config() {
    let config = config();
    let agent = agent();

    for flow in &config.flows {
        let chain = agent.chain(flow.id).unwrap();
        let configured: Vec<_> = flow.nodes.iter().map(|n| n.name.clone()).collect();
        assert_eq!(chain.visit_order(), configured);

        let last = configured.last().unwrap();
        assert_eq!(chain.step(last).unwrap().next, Transition::End);
    }
}

#[test]
fn test_unknown_node_type_fails_startup() {
    let yaml = CONFIG.replace("type: MathNode", "type: AbacusNode");
    let config = FlowsConfig::from_yaml(&yaml).unwrap();
    let nodes = default_registry(&config.nodes, ApiKeys::default()).unwrap();

    let err = Agent::new(&config, nodes).unwrap_err();
    assert!(matches!(err, WaypointError::UnknownNodeType(ref t) if t == "AbacusNode"));
}

#[test]
fn test_missing_implementation_fails_startup() {
    let mut nodes = NodeRegistry::new();
    nodes.register(Arc::new(waypoint_nodes::MathNode::new()));

    let err = Agent::new(&config(), nodes).unwrap_err();
    assert!(err.is_config());
}

// ============================================================================
// End-to-end runs
// ============================================================================

#[tokio::test]
async fn test_calculate_routes_to_math_and_adds() {
    let envelope = agent()
        .execute("calculate 15 + 25 * 3", None, HashMap::new())
        .await;

    assert!(envelope.success, "error: {:?}", envelope.error);
    assert_eq!(envelope.flow_used, "math");
    assert!(envelope.output.contains("40.0"), "output: {}", envelope.output);
    assert!(envelope.output.contains("15.0 + 25.0 = 40.0"));
    assert_eq!(envelope.error, None);

    let names: Vec<_> = envelope.node_results.names().collect();
    assert_eq!(names, vec!["math", "output"]);
    assert_eq!(
        envelope.routing.as_ref().unwrap().reason,
        RouteReason::Pattern("calculate".to_string())
    );
    assert!(envelope.validation_results.get("math").unwrap().is_valid);
}

#[tokio::test]
async fn test_divide_by_zero_fails_before_arithmetic() {
    let envelope = agent().execute("10 / 0", Some("math"), HashMap::new()).await;

    assert!(!envelope.success);
    let error = envelope.error.clone().unwrap();
    assert!(error.contains("Division by zero"), "error: {}", error);
    assert_eq!(envelope.error_kind.as_deref(), Some("validation_error"));
    assert_eq!(envelope.output, NO_OUTPUT);

    let names: Vec<_> = envelope.node_results.names().collect();
    assert_eq!(names, vec!["math"]);
    assert!(!envelope.node_results.get("math").unwrap().success);
    assert!(!envelope.validation_results.get("math").unwrap().is_valid);
}

#[tokio::test]
async fn test_keyword_math() {
    let envelope = agent().execute("divide 100 by 4", None, HashMap::new()).await;

    assert!(envelope.success);
    assert!(envelope.output.contains("Result: 25.0"));
}

#[tokio::test]
async fn test_fallback_operands_surface_as_warning() {
    let envelope = agent()
        .execute("multiply things", Some("math"), HashMap::new())
        .await;

    assert!(envelope.success);
    let validation = envelope.validation_results.get("math").unwrap();
    assert_eq!(validation.warnings.len(), 1);
    assert!(validation.warnings[0].contains("placeholder operands"));
}

#[tokio::test]
async fn test_unknown_override_returns_failure_envelope() {
    let envelope = agent().execute("hi", Some("Weather"), HashMap::new()).await;

    assert!(!envelope.success);
    assert_eq!(envelope.flow_used, "Weather");
    assert_eq!(envelope.error.as_deref(), Some("Unknown flow type: Weather"));
    assert_eq!(envelope.output, "Agent execution failed: Unknown flow type: Weather");
    assert!(envelope.node_results.is_empty());
    assert!(envelope.run_id.is_none());
}

#[tokio::test]
async fn test_unconfigured_flow_returns_failure_envelope() {
    let yaml = r#"
flows:
  - id: math
    nodes:
      - name: math
        type: MathNode
routing:
  default: math
"#;
    let config = FlowsConfig::from_yaml(yaml).unwrap();
    let nodes = default_registry(&config.nodes, ApiKeys::default()).unwrap();
    let agent = Agent::new(&config, nodes).unwrap();

    let envelope = agent.execute("hello", Some("llm"), HashMap::new()).await;
    assert!(!envelope.success);
    assert_eq!(envelope.error_kind.as_deref(), Some("config_error"));
}

#[tokio::test]
async fn test_search_without_key_reports_validation() {
    let envelope = agent()
        .execute("search for rust tutorials", None, HashMap::new())
        .await;

    assert!(!envelope.success);
    assert_eq!(envelope.flow_used, "search");
    let validation = envelope.validation_results.get("search").unwrap();
    assert!(validation
        .errors
        .iter()
        .any(|e| e.contains("SERPER_API_KEY")));
    assert!(!envelope.node_results.contains("output"));
}

#[tokio::test]
async fn test_default_flow_when_nothing_matches() {
    let envelope = agent().execute("tell me a story", None, HashMap::new()).await;

    assert_eq!(envelope.flow_used, "llm");
    assert_eq!(envelope.routing.unwrap().reason, RouteReason::Default);
    // No API key configured in tests
    assert!(!envelope.success);
}

#[tokio::test]
async fn test_execution_time_is_sum_of_node_times() {
    let envelope = agent().execute("4*6", None, HashMap::new()).await;

    let sum: f64 = envelope.node_results.values().map(|n| n.execution_time).sum();
    assert!((envelope.execution_time - sum).abs() < 1e-12);
}

#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let agent = agent();
    let inputs = ["1 + 2", "3 * 4", "10 - 7", "9 / 3"];

    let envelopes = futures::future::join_all(
        inputs
            .iter()
            .map(|input| agent.execute(input, Some("math"), HashMap::new())),
    )
    .await;

    let expected = ["3.0", "12.0", "3.0", "3.0"];
    for (envelope, result) in envelopes.iter().zip(expected) {
        assert!(envelope.success);
        assert!(envelope.output.contains(&format!("Result: {}", result)));
    }

    let mut ids: Vec<Uuid> = envelopes.iter().filter_map(|e| e.run_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), inputs.len());
    assert!(agent.in_flight().is_empty());
}

// ============================================================================
// Cancellation
// ============================================================================

struct SlowSearch;

#[async_trait]
impl Node for SlowSearch {
    fn node_type(&self) -> NodeType {
        NodeType::SearchNode
    }

    async fn process(&self, _state: &AgentState) -> WaypointResult<NodePayload> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(NodePayload::Text("slow".to_string()))
    }
}

#[tokio::test]
async fn test_cancel_in_flight_run() {
    let config = config();
    let mut nodes = default_registry(&config.nodes, ApiKeys::default()).unwrap();
    nodes.register(Arc::new(SlowSearch));

    let (tx, mut rx) = mpsc::channel(64);
    let agent = Agent::new(&config, nodes).unwrap().with_event_channel(tx);

    let canceller = async {
        while let Some(event) = rx.recv().await {
            if let EngineEvent::RunStarted { run_id, flow } = event {
                assert_eq!(flow, FlowType::Search);
                assert!(agent.cancel(run_id));
                break;
            }
        }
    };

    let (envelope, _) = tokio::join!(
        agent.execute("search for slow things", None, HashMap::new()),
        canceller
    );

    assert!(!envelope.success);
    assert_eq!(envelope.error.as_deref(), Some("execution cancelled"));
    assert_eq!(envelope.error_kind.as_deref(), Some("cancelled"));
    assert!(envelope.node_results.contains("search"));
    assert!(!envelope.node_results.contains("output"));
    assert!(agent.in_flight().is_empty());
    assert!(!agent.cancel(Uuid::new_v4()));
}
