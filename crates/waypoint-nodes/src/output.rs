//! Output Node
//!
//! Turns the most recent upstream result into the run's final output text.
//! Formatting problems degrade the output instead of failing the run: the
//! node records a failed result and writes an error string as the output,
//! but leaves `error_message` untouched.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, warn};
use waypoint_core::{
    AgentState, LlmPayload, MathPayload, Node, NodePayload, NodeResult, NodeType, SearchPayload,
    StepOutcome, WaypointError, WaypointResult,
};

use crate::math::format_number;

const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct OutputNode;

impl OutputNode {
    pub fn new() -> Self {
        Self
    }

    /// Format a payload with the formatter for its variant
    pub fn format(payload: &NodePayload) -> WaypointResult<String> {
        match payload {
            NodePayload::Search(data) => Ok(format_search(data)),
            NodePayload::Llm(data) => Ok(format_llm(data)),
            NodePayload::Math(data) => Ok(format_math(data)),
            NodePayload::Text(text) => Ok(text.clone()),
            NodePayload::Empty => Err(WaypointError::formatting("upstream result has no data")),
        }
    }

    fn render(state: &AgentState) -> WaypointResult<String> {
        let (name, upstream) = state.node_results.last().ok_or_else(|| {
            WaypointError::formatting(format!("No result found for flow type: {}", state.flow_type))
        })?;

        debug!(upstream = name, "formatting upstream result");
        match &upstream.error {
            Some(error) if !upstream.success => Ok(format!(
                "Error in {} operation: {}",
                state.flow_type, error
            )),
            _ => Self::format(&upstream.data),
        }
    }
}

fn format_search(data: &SearchPayload) -> String {
    let mut lines = vec![
        format!("🔍 Search Results for: '{}'", data.query),
        format!("Found {} results\n", data.total_results),
    ];

    for (i, hit) in data.results.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, hit.title));
        lines.push(format!("   {}", hit.snippet));
        lines.push(format!("   🔗 {}\n", hit.link));
    }

    lines.join("\n")
}

fn format_llm(data: &LlmPayload) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    [
        "🤖 AI Response:".to_string(),
        rule.clone(),
        data.response.clone(),
        rule,
        format!(
            "Model: {} | Estimated tokens: {}",
            data.model, data.tokens_estimated
        ),
    ]
    .join("\n")
}

fn format_math(data: &MathPayload) -> String {
    [
        "🧮 Mathematical Calculation:".to_string(),
        format!("Operation: {}", title_case(&data.operation)),
        format!("Expression: {}", data.expression),
        format!("Result: {}", format_number(data.result)),
    ]
    .join("\n")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl Node for OutputNode {
    fn node_type(&self) -> NodeType {
        NodeType::OutputNode
    }

    async fn process(&self, state: &AgentState) -> WaypointResult<NodePayload> {
        Self::render(state).map(NodePayload::Text)
    }

    async fn execute(&self, name: &str, state: &mut AgentState) -> StepOutcome {
        let run_id = state.run_id();
        let start = Instant::now();
        let rendered = Self::render(state);
        state.advance(name);

        match rendered {
            Ok(text) => {
                state.final_output = Some(text.clone());
                state.record_result(
                    name,
                    NodeResult::completed(run_id, NodePayload::Text(text), start.elapsed()),
                );
            }
            Err(err) => {
                warn!(node = name, "{}", err);
                let reason = match &err {
                    WaypointError::Formatting(reason) => reason.clone(),
                    other => other.to_string(),
                };
                state.final_output = Some(format!("Output formatting error: {}", reason));
                state.record_result(name, NodeResult::failed(run_id, reason, start.elapsed()));
            }
        }

        StepOutcome::Continue
    }
}
