//! FlowRouter - Decides which flow handles a request
//!
//! Resolution order:
//! - Explicit override (must name a known flow type, case-insensitive)
//! - Case-insensitive substring match against each flow's patterns, scanning
//!   flows and their pattern lists in configured order
//! - The configured default flow

use std::sync::Arc;

use tracing::debug;
use waypoint_core::{FlowRegistry, FlowType, RouteReason, RoutingDecision, WaypointResult};

/// Stateless router over the flow registry's pattern table
#[derive(Debug, Clone)]
pub struct FlowRouter {
    registry: Arc<FlowRegistry>,
    default_flow: FlowType,
}

impl FlowRouter {
    pub fn new(registry: Arc<FlowRegistry>, default_flow: FlowType) -> Self {
        Self {
            registry,
            default_flow,
        }
    }

    pub fn default_flow(&self) -> FlowType {
        self.default_flow
    }

    /// Route `text`, honouring an explicit override when one is given.
    ///
    /// An empty or whitespace-only override counts as absent.
    pub fn route(&self, text: &str, explicit: Option<&str>) -> WaypointResult<RoutingDecision> {
        if let Some(name) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            let flow_type: FlowType = name.parse()?;
            debug!(flow = %flow_type, "explicit flow override");
            return Ok(RoutingDecision {
                flow_type,
                reason: RouteReason::Explicit(name.to_string()),
            });
        }

        let lowered = text.to_lowercase();
        for (flow_type, patterns) in self.registry.patterns() {
            let hit = patterns
                .iter()
                .filter(|p| !p.is_empty())
                .find(|p| lowered.contains(&p.to_lowercase()));

            if let Some(pattern) = hit {
                debug!(flow = %flow_type, pattern = %pattern, "pattern matched");
                return Ok(RoutingDecision {
                    flow_type,
                    reason: RouteReason::Pattern(pattern.clone()),
                });
            }
        }

        debug!(flow = %self.default_flow, "no pattern matched; using default");
        Ok(RoutingDecision {
            flow_type: self.default_flow,
            reason: RouteReason::Default,
        })
    }
}
