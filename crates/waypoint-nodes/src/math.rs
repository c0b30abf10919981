//! Math Node
//!
//! Folds a named arithmetic operation left-to-right over the operands.
//!
//! ## Operations
//!
//! `add`, `subtract`, `multiply`, `divide`, `power`, `modulo`
//!
//! Division or modulo by zero is rejected during validation, before any
//! arithmetic runs.

use async_trait::async_trait;
use waypoint_core::{
    AgentState, MathInput, MathPayload, Node, NodePayload, NodeType, NormalizedInput,
    OperandSource, ValidationResult, WaypointError, WaypointResult,
};

/// Supported operations, in display order
pub const OPERATIONS: [&str; 6] = ["add", "subtract", "multiply", "divide", "power", "modulo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
}

impl Op {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "multiply" => Some(Self::Multiply),
            "divide" => Some(Self::Divide),
            "power" => Some(Self::Power),
            "modulo" => Some(Self::Modulo),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
            Self::Power => "^",
            Self::Modulo => "%",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
            Self::Power => a.powf(b),
            // Floored modulo: the result takes the sign of the divisor
            Self::Modulo => a - b * (a / b).floor(),
        }
    }
}

/// Render a number with at least one decimal place (`40` → `40.0`)
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MathNode;

impl MathNode {
    pub fn new() -> Self {
        Self
    }

    fn input(state: &AgentState) -> Option<&MathInput> {
        match &state.input {
            NormalizedInput::Math(m) => Some(m),
            _ => None,
        }
    }

    /// Check an operation request without touching run state
    pub fn check(input: &MathInput) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let op = if input.operation.trim().is_empty() {
            errors.push("Operation is required".to_string());
            None
        } else {
            let op = Op::parse(&input.operation);
            if op.is_none() {
                errors.push(format!(
                    "Unsupported operation: {}. Available: {}",
                    input.operation,
                    OPERATIONS.join(", ")
                ));
            }
            op
        };

        if input.operands.len() < 2 {
            errors.push("At least 2 operands are required".to_string());
        }

        for (i, operand) in input.operands.iter().enumerate() {
            if !operand.is_finite() {
                errors.push(format!("Operand {} is not a valid number: {}", i + 1, operand));
            }
        }

        let zero_divisor = input.operands.iter().skip(1).any(|v| *v == 0.0);
        match op {
            Some(Op::Divide) if zero_divisor => {
                errors.push("Division by zero is not allowed".to_string())
            }
            Some(Op::Modulo) if zero_divisor => {
                errors.push("Modulo by zero is not allowed".to_string())
            }
            _ => {}
        }

        if input.source == OperandSource::Fallback {
            warnings.push(format!(
                "Could not find two numbers in the input; using placeholder operands {}",
                input
                    .operands
                    .iter()
                    .map(|v| format_number(*v))
                    .collect::<Vec<_>>()
                    .join(" and ")
            ));
        }

        ValidationResult::from_checks(errors, warnings)
    }

    /// Evaluate a validated request
    pub fn evaluate(input: &MathInput) -> WaypointResult<MathPayload> {
        let op = Op::parse(&input.operation).ok_or_else(|| {
            WaypointError::validation(format!("Unsupported operation: {}", input.operation))
        })?;
        let (first, rest) = input
            .operands
            .split_first()
            .ok_or_else(|| WaypointError::validation("At least 2 operands are required"))?;

        let result = rest.iter().fold(*first, |acc, v| op.apply(acc, *v));
        if !result.is_finite() {
            return Err(WaypointError::validation(format!(
                "Result of {} is not a finite number",
                input.operation
            )));
        }

        let expression = format!(
            "{} = {}",
            input
                .operands
                .iter()
                .map(|v| format_number(*v))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", op.symbol())),
            format_number(result)
        );

        Ok(MathPayload {
            operation: input.operation.clone(),
            operands: input.operands.clone(),
            result,
            expression,
        })
    }
}

#[async_trait]
impl Node for MathNode {
    fn node_type(&self) -> NodeType {
        NodeType::MathNode
    }

    fn validate(&self, state: &AgentState) -> ValidationResult {
        match Self::input(state) {
            Some(input) => Self::check(input),
            None => ValidationResult::from_checks(
                vec![format!("Math node cannot handle {} input", state.flow_type)],
                vec![],
            ),
        }
    }

    async fn process(&self, state: &AgentState) -> WaypointResult<NodePayload> {
        let input = Self::input(state)
            .ok_or_else(|| WaypointError::validation("Math input is required"))?;
        Ok(NodePayload::Math(Self::evaluate(input)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input(operation: &str, operands: &[f64]) -> MathInput {
        MathInput {
            operation: operation.to_string(),
            operands: operands.to_vec(),
            source: OperandSource::Inline,
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(40.0), "40.0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3.0");
    }

    #[test]
    fn test_add() {
        let payload = MathNode::evaluate(&input("add", &[15.0, 25.0])).unwrap();
        assert_eq!(payload.result, 40.0);
        assert_eq!(payload.expression, "15.0 + 25.0 = 40.0");
    }

    #[test]
    fn test_left_fold() {
        let payload = MathNode::evaluate(&input("subtract", &[20.0, 5.0, 3.0])).unwrap();
        assert_eq!(payload.result, 12.0);
        assert_eq!(payload.expression, "20.0 - 5.0 - 3.0 = 12.0");

        let payload = MathNode::evaluate(&input("divide", &[100.0, 4.0])).unwrap();
        assert_eq!(payload.result, 25.0);
        assert_eq!(payload.expression, "100.0 ÷ 4.0 = 25.0");
    }

    #[test]
    fn test_power_and_modulo() {
        assert_eq!(MathNode::evaluate(&input("power", &[2.0, 10.0])).unwrap().result, 1024.0);
        assert_eq!(MathNode::evaluate(&input("modulo", &[17.0, 5.0])).unwrap().result, 2.0);
        assert_eq!(MathNode::evaluate(&input("modulo", &[-7.0, 3.0])).unwrap().result, 2.0);
    }

    #[test]
    fn test_unknown_operation_lists_supported() {
        let v = MathNode::check(&input("sqrt", &[4.0, 2.0]));
        assert!(!v.is_valid);
        assert_eq!(
            v.errors,
            vec![
                "Unsupported operation: sqrt. \
                 Available: add, subtract, multiply, divide, power, modulo"
            ]
        );
    }

    #[test]
    fn test_errors_are_collected() {
        let v = MathNode::check(&input("", &[1.0]));
        assert_eq!(
            v.errors,
            vec!["Operation is required", "At least 2 operands are required"]
        );
    }

    #[test]
    fn test_division_by_zero_rejected() {
        let v = MathNode::check(&input("divide", &[10.0, 0.0]));
        assert!(!v.is_valid);
        assert_eq!(v.errors, vec!["Division by zero is not allowed"]);

        let v = MathNode::check(&input("modulo", &[10.0, 0.0]));
        assert_eq!(v.errors, vec!["Modulo by zero is not allowed"]);

        assert!(MathNode::check(&input("multiply", &[10.0, 0.0])).is_valid);
    }

    #[test]
    fn test_non_finite_operand() {
        let v = MathNode::check(&input("add", &[1.0, f64::NAN]));
        assert_eq!(v.errors, vec!["Operand 2 is not a valid number: NaN"]);
    }

    #[test]
    fn test_fallback_operands_warn() {
        let mut request = input("add", &[10.0, 5.0]);
        request.source = OperandSource::Fallback;
        let v = MathNode::check(&request);
        assert!(v.is_valid);
        assert_eq!(
            v.warnings,
            vec!["Could not find two numbers in the input; using placeholder operands 10.0 and 5.0"]
        );
    }
}
