// Waypoint Core - Flow specification types
//
// A flow is a named, linear pipeline of typed nodes. The configuration
// supplies the node list in execution order; each node may name its
// successor, and a node without `next` ends the chain.
//
// Example:
// ```yaml
// - id: math
//   name: Math Flow
//   description: Arithmetic on numbers found in the request
//   tags: [math]
//   patterns: [calculate, compute]
//   nodes:
//     - name: math
//       type: MathNode
//       next: output
//     - name: output
//       type: OutputNode
// ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::WaypointError;

/// Category of request a flow handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    /// Web search
    Search,
    /// Free-form chat completion
    Llm,
    /// Arithmetic
    Math,
}

impl FlowType {
    /// All flow types, in declaration order
    pub const ALL: [FlowType; 3] = [FlowType::Search, FlowType::Llm, FlowType::Math];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Llm => "llm",
            Self::Math => "math",
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowType {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "search" => Ok(Self::Search),
            "llm" => Ok(Self::Llm),
            "math" => Ok(Self::Math),
            _ => Err(WaypointError::UnknownFlow(s.to_string())),
        }
    }
}

/// Node implementation kinds known to the node registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    SearchNode,
    #[serde(rename = "LLMNode")]
    LlmNode,
    MathNode,
    OutputNode,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::SearchNode,
        NodeType::LlmNode,
        NodeType::MathNode,
        NodeType::OutputNode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchNode => "SearchNode",
            Self::LlmNode => "LLMNode",
            Self::MathNode => "MathNode",
            Self::OutputNode => "OutputNode",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| WaypointError::UnknownNodeType(s.to_string()))
    }
}

/// One step of a flow as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Node name, unique within the flow; results are keyed by it
    pub name: String,

    /// Node type as written; resolved against the node registry at compile time
    #[serde(rename = "type")]
    pub node_type: String,

    /// Successor node name; absent means the terminal edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, node_type: NodeType, next: Option<&str>) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.as_str().to_string(),
            next: next.map(str::to_string),
        }
    }

    /// Resolve the configured type string to a typed node kind
    pub fn kind(&self) -> Result<NodeType, WaypointError> {
        self.node_type.parse()
    }
}

/// A configured flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSpec {
    /// Flow identifier
    pub id: FlowType,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for listing/categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Routing keywords, matched as case-insensitive substrings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,

    /// Nodes in execution order
    pub nodes: Vec<NodeSpec>,
}

impl FlowSpec {
    /// Validate the structural rules of a single flow
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("Flow '{}' requires at least one node", self.id));
        }

        let mut names = HashSet::new();
        for node in &self.nodes {
            if node.name.trim().is_empty() {
                return Err(format!("Flow '{}' has a node with an empty name", self.id));
            }
            if !names.insert(node.name.as_str()) {
                return Err(format!(
                    "Flow '{}' has duplicate node name: {}",
                    self.id, node.name
                ));
            }
        }

        for node in &self.nodes {
            if let Some(next) = &node.next {
                if !names.contains(next.as_str()) {
                    return Err(format!(
                        "Node '{}' in flow '{}' references unknown successor: {}",
                        node.name, self.id, next
                    ));
                }
            }
        }

        Ok(())
    }

    /// Entry node (first in the configured list)
    pub fn entry(&self) -> Option<&NodeSpec> {
        self.nodes.first()
    }

    /// Find a node by name
    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
