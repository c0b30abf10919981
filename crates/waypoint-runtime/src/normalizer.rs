//! InputNormalizer - Derives the flow-specific payload from raw text
//!
//! One strategy per flow type:
//! - search: strip the first known lead-in phrase to get the query
//! - llm: pass the text through as the prompt with a system message
//! - math: inline `a <op> b` expression first, then keyword detection

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use waypoint_core::{
    FlowType, MathInput, NodeSettings, NormalizedInput, OperandSource, WaypointError,
    WaypointResult, DEFAULT_NUM_RESULTS, DEFAULT_SYSTEM_MESSAGE,
};

/// Lead-in phrases removed from search requests, in priority order
pub const SEARCH_LEAD_INS: [&str; 4] = [
    "search for",
    "find information about",
    "look up",
    "google",
];

/// Operands substituted when fewer than two numbers are found
pub const FALLBACK_OPERANDS: [f64; 2] = [10.0, 5.0];

static INLINE_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*([+\-*/×÷])\s*(\d+(?:\.\d+)?)").expect("static regex")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"));

/// Keyword groups checked in order; the first group with any hit wins.
/// ASCII operator symbols are only recognised inside an inline expression.
const OPERATION_KEYWORDS: [(&str, &[&str]); 4] = [
    ("add", &["add", "plus"]),
    ("subtract", &["subtract", "minus"]),
    ("multiply", &["multiply", "times", "×"]),
    ("divide", &["divide", "divided by", "÷"]),
];

#[derive(Debug, Clone)]
pub struct InputNormalizer {
    num_results: usize,
    system_message: String,
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_RESULTS, DEFAULT_SYSTEM_MESSAGE)
    }
}

impl InputNormalizer {
    pub fn new(num_results: usize, system_message: impl Into<String>) -> Self {
        Self {
            num_results,
            system_message: system_message.into(),
        }
    }

    /// Use the result-count hint and system message from node settings
    pub fn from_settings(settings: &NodeSettings) -> Self {
        Self::new(settings.search.num_results, settings.llm.system_message.clone())
    }

    /// Normalize for a resolved flow type
    pub fn normalize(&self, text: &str, flow_type: FlowType) -> NormalizedInput {
        match flow_type {
            FlowType::Search => self.search(text),
            FlowType::Llm => self.llm(text),
            FlowType::Math => NormalizedInput::Math(parse_math(text)),
        }
    }

    /// Normalize for a flow named by string
    pub fn normalize_named(&self, text: &str, flow: &str) -> WaypointResult<NormalizedInput> {
        let flow_type: FlowType = flow
            .parse()
            .map_err(|_| WaypointError::UnknownFlowType(flow.to_string()))?;
        Ok(self.normalize(text, flow_type))
    }

    fn search(&self, text: &str) -> NormalizedInput {
        let lowered = text.to_lowercase();
        let query = SEARCH_LEAD_INS
            .iter()
            .find(|phrase| lowered.contains(*phrase))
            .map(|phrase| lowered.replacen(phrase, "", 1).trim().to_string())
            .unwrap_or_else(|| text.to_string());

        debug!(query = %query, "normalized search input");
        NormalizedInput::Search {
            query,
            num_results: self.num_results,
        }
    }

    fn llm(&self, text: &str) -> NormalizedInput {
        NormalizedInput::Llm {
            prompt: text.to_string(),
            system_message: self.system_message.clone(),
        }
    }
}

/// Parse arithmetic intent out of free text
pub fn parse_math(text: &str) -> MathInput {
    if let Some(caps) = INLINE_EXPR.captures(text.trim()) {
        let operands: Vec<f64> = [&caps[1], &caps[3]]
            .iter()
            .filter_map(|n| n.parse().ok())
            .collect();
        let operation = match &caps[2] {
            "-" => "subtract",
            "*" | "×" => "multiply",
            "/" | "÷" => "divide",
            _ => "add",
        };

        debug!(operation, ?operands, "inline expression matched");
        return MathInput {
            operation: operation.to_string(),
            operands,
            source: OperandSource::Inline,
        };
    }

    let lowered = text.to_lowercase();
    let operation = OPERATION_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(op, _)| *op)
        .unwrap_or("add");

    let numbers: Vec<f64> = NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    if numbers.len() < 2 {
        warn!(
            found = numbers.len(),
            "fewer than two numbers in math input; substituting placeholder operands"
        );
        return MathInput {
            operation: operation.to_string(),
            operands: FALLBACK_OPERANDS.to_vec(),
            source: OperandSource::Fallback,
        };
    }

    MathInput {
        operation: operation.to_string(),
        operands: numbers,
        source: OperandSource::Keywords,
    }
}
