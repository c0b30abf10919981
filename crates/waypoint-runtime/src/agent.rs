//! Agent - Entry point that routes, normalizes, executes and aggregates
//!
//! All collaborators are constructed once in `Agent::new` and shared by
//! every run. Runs are independent: each gets its own state, run id and
//! cancellation token, and in-flight runs can be cancelled by id.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use waypoint_core::{
    AgentState, ExecutionContext, FlowRegistry, FlowType, FlowsConfig, NodeRegistry,
    WaypointError, WaypointResult,
};

use crate::aggregator::{aggregate, ResultEnvelope};
use crate::engine::{EngineEvent, ExecutionEngine};
use crate::graph::{ExecutableChain, GraphBuilder};
use crate::normalizer::InputNormalizer;
use crate::router::FlowRouter;

/// Caller-supplied run metadata
pub type Metadata = HashMap<String, serde_json::Value>;

pub struct Agent {
    registry: Arc<FlowRegistry>,
    router: FlowRouter,
    normalizer: InputNormalizer,
    builder: GraphBuilder,
    chains: HashMap<FlowType, Arc<ExecutableChain>>,
    engine: ExecutionEngine,
    in_flight: DashMap<Uuid, CancellationToken>,
}

/// Removes a run from the in-flight table however the run ends
struct InFlightGuard<'a> {
    table: &'a DashMap<Uuid, CancellationToken>,
    run_id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(&self.run_id);
    }
}

impl Agent {
    /// Build the agent and compile every configured flow.
    ///
    /// Fails with `UnknownNodeType` if a flow uses a node type that has no
    /// implementation in `nodes`.
    pub fn new(config: &FlowsConfig, nodes: NodeRegistry) -> WaypointResult<Self> {
        let registry = Arc::new(FlowRegistry::from_config(config));
        let builder = GraphBuilder::new(nodes);
        let chains = builder.compile_all(&registry)?;

        info!(
            flows = chains.len(),
            max_steps = config.engine.max_steps,
            "Agent initialized"
        );

        Ok(Self {
            router: FlowRouter::new(registry.clone(), config.routing.default),
            normalizer: InputNormalizer::from_settings(&config.nodes),
            engine: ExecutionEngine::new(config.engine.max_steps),
            registry,
            builder,
            chains,
            in_flight: DashMap::new(),
        })
    }

    /// Add event channel for monitoring
    pub fn with_event_channel(mut self, tx: mpsc::Sender<EngineEvent>) -> Self {
        self.engine = self.engine.with_event_channel(tx);
        self
    }

    pub fn flows(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn router(&self) -> &FlowRouter {
        &self.router
    }

    pub fn nodes(&self) -> &NodeRegistry {
        self.builder.nodes()
    }

    pub fn chain(&self, flow_type: FlowType) -> Option<&ExecutableChain> {
        self.chains.get(&flow_type).map(Arc::as_ref)
    }

    /// Compiled chains in configuration order
    pub fn chains(&self) -> Vec<&ExecutableChain> {
        self.registry
            .list()
            .into_iter()
            .filter_map(|f| self.chain(f))
            .collect()
    }

    /// Execute one request end to end. Never fails: errors that escape the
    /// pipeline are reported as a failed envelope.
    #[instrument(skip(self, metadata), fields(flow = explicit_flow.unwrap_or("auto")))]
    pub async fn execute(
        &self,
        user_input: &str,
        explicit_flow: Option<&str>,
        metadata: Metadata,
    ) -> ResultEnvelope {
        match self.try_execute(user_input, explicit_flow, metadata).await {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(kind = err.kind(), "Agent execution failed: {}", err);
                ResultEnvelope::boundary_failure(&err, explicit_flow)
            }
        }
    }

    async fn try_execute(
        &self,
        user_input: &str,
        explicit_flow: Option<&str>,
        metadata: Metadata,
    ) -> WaypointResult<ResultEnvelope> {
        let routing = self.router.route(user_input, explicit_flow)?;
        let flow_type = routing.flow_type;

        let chain = self.chains.get(&flow_type).cloned().ok_or_else(|| {
            WaypointError::config(format!("Flow '{}' is not configured", flow_type))
        })?;

        let input = self.normalizer.normalize(user_input, flow_type);
        let context = ExecutionContext::new(metadata);
        let mut state = AgentState::new(user_input, routing, input, context);
        let run_id = state.run_id();

        let token = CancellationToken::new();
        self.in_flight.insert(run_id, token.clone());
        let _guard = InFlightGuard {
            table: &self.in_flight,
            run_id,
        };

        info!(%run_id, flow = %flow_type, "Executing flow");
        self.engine.run(&chain, &mut state, &token).await?;

        Ok(aggregate(&state))
    }

    /// Cancel an in-flight run; takes effect at the next node transition.
    /// Returns false if the run is not in flight.
    pub fn cancel(&self, run_id: Uuid) -> bool {
        match self.in_flight.get(&run_id) {
            Some(token) => {
                token.cancel();
                info!(%run_id, "Run cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight run; returns how many were signalled
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        for entry in self.in_flight.iter() {
            entry.value().cancel();
            count += 1;
        }
        count
    }

    /// Ids of runs currently executing
    pub fn in_flight(&self) -> Vec<Uuid> {
        self.in_flight.iter().map(|e| *e.key()).collect()
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("flows", &self.registry.list())
            .field("nodes", self.builder.nodes())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
