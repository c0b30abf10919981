//! ExecutionEngine - Runs a compiled chain against one run's state
//!
//! The engine walks edges from the entry node, invoking each node's
//! `execute` step and following the successor edge until the terminal
//! marker. It stops at the first step that reports `Halt`, when the step
//! guard trips, or when the run is cancelled between transitions. It knows
//! nothing about node semantics.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use waypoint_core::{
    AgentState, FlowType, StepOutcome, WaypointError, WaypointResult, DEFAULT_MAX_STEPS, END,
};

use crate::graph::{ExecutableChain, Transition};

/// Events emitted while a chain runs
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RunStarted {
        run_id: Uuid,
        flow: FlowType,
    },
    NodeStarted {
        run_id: Uuid,
        node: String,
    },
    NodeCompleted {
        run_id: Uuid,
        node: String,
        execution_time: f64,
    },
    NodeFailed {
        run_id: Uuid,
        node: String,
        error: String,
    },
    RunCompleted {
        run_id: Uuid,
        success: bool,
        steps: usize,
    },
}

#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    max_steps: usize,
    event_tx: Option<mpsc::Sender<EngineEvent>>,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

impl ExecutionEngine {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps: max_steps.max(1),
            event_tx: None,
        }
    }

    /// Add event channel for monitoring
    pub fn with_event_channel(mut self, tx: mpsc::Sender<EngineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run `chain` to completion against `state`.
    ///
    /// Node failures, the step guard and cancellation all end up in
    /// `state.error_message`; an `Err` here means the chain itself is broken.
    #[instrument(skip_all, fields(run_id = %state.run_id(), flow = %chain.flow()))]
    pub async fn run(
        &self,
        chain: &ExecutableChain,
        state: &mut AgentState,
        cancel: &CancellationToken,
    ) -> WaypointResult<()> {
        let run_id = state.run_id();
        info!("Starting chain");

        self.emit_event(EngineEvent::RunStarted {
            run_id,
            flow: chain.flow(),
        })
        .await;

        let mut cursor = Transition::Node(chain.entry().to_string());
        let mut steps = 0usize;

        while let Transition::Node(name) = cursor {
            if cancel.is_cancelled() {
                warn!(node = %name, "run cancelled before step");
                state.fail(&WaypointError::Cancelled);
                break;
            }

            if steps >= self.max_steps {
                warn!(max_steps = self.max_steps, "step guard tripped");
                state.fail(&WaypointError::MaxStepsExceeded(self.max_steps));
                break;
            }
            steps += 1;

            let step = chain.step(&name).ok_or_else(|| {
                WaypointError::config(format!(
                    "Step '{}' is missing from the '{}' chain",
                    name,
                    chain.flow()
                ))
            })?;

            debug!(node = %name, node_type = %step.node_type, "executing step");
            self.emit_event(EngineEvent::NodeStarted {
                run_id,
                node: name.clone(),
            })
            .await;

            let outcome = step.node.execute(&name, state).await;

            if let Some(result) = state.node_results.get(&name) {
                let event = match &result.error {
                    None => EngineEvent::NodeCompleted {
                        run_id,
                        node: name.clone(),
                        execution_time: result.execution_time,
                    },
                    Some(error) => EngineEvent::NodeFailed {
                        run_id,
                        node: name.clone(),
                        error: error.clone(),
                    },
                };
                self.emit_event(event).await;
            }

            if outcome == StepOutcome::Halt {
                debug!(node = %name, "step halted the chain");
                break;
            }

            cursor = step.next.clone();
        }

        if !state.is_halted() {
            state.advance(END);
        }

        let success = !state.is_halted();
        info!(steps, success, "Chain finished");

        self.emit_event(EngineEvent::RunCompleted {
            run_id,
            success,
            steps,
        })
        .await;

        Ok(())
    }

    async fn emit_event(&self, event: EngineEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).await.is_err() {
                warn!("Failed to send engine event");
            }
        }
    }
}
