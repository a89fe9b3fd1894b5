//! Execution run state
//!
//! An [`ExecutionRun`] owns the state of one plan execution. The controller
//! handle and the run task share it through an `Arc`; every change goes
//! through a `watch` channel so suspended waiters wake up on transitions.
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --resume--> Running
//! Running --(last step)--> Completed
//! Running --(unrecoverable step)--> Failed
//! {Running, Paused} --cancel--> Cancelled
//! ```

use std::fmt;

use action_gate::{GateError, Suspendable};
use async_trait::async_trait;
use autofill_core_types::RunId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Cancelled => "cancelled",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }

    /// Running or Paused
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Running | RunState::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Cancelled | RunState::Completed | RunState::Failed
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who paused the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseOrigin {
    User,
    Intervention,
}

/// Point-in-time view of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub state: RunState,

    /// Step being executed; `None` before the first step
    pub step_index: Option<usize>,
    pub total_steps: usize,
    pub intervention_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_by: Option<PauseOrigin>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub struct ExecutionRun {
    id: RunId,
    cancel: CancellationToken,
    state: watch::Sender<RunSnapshot>,
}

impl ExecutionRun {
    pub fn new(total_steps: usize) -> Self {
        let id = RunId::new();
        let (state, _) = watch::channel(RunSnapshot {
            run_id: id.clone(),
            state: RunState::Idle,
            step_index: None,
            total_steps,
            intervention_count: 0,
            paused_by: None,
            last_error: None,
        });
        Self {
            id,
            cancel: CancellationToken::new(),
            state,
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.state.borrow().clone()
    }

    pub fn state(&self) -> RunState {
        self.state.borrow().state
    }

    pub fn intervention_count(&self) -> u32 {
        self.state.borrow().intervention_count
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.state.subscribe()
    }

    /// Cancelled whenever the run is cancelled; shared with every step.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Idle -> Running
    pub fn start(&self) -> Result<(), FlowError> {
        self.transition("start", |snap| match snap.state {
            RunState::Idle => {
                snap.state = RunState::Running;
                Ok(true)
            }
            _ => Err(()),
        })
    }

    /// Running -> Paused, by the user
    pub fn pause(&self) -> Result<(), FlowError> {
        self.transition("pause", |snap| match snap.state {
            RunState::Running => {
                snap.state = RunState::Paused;
                snap.paused_by = Some(PauseOrigin::User);
                Ok(true)
            }
            _ => Err(()),
        })
    }

    /// Paused -> Running. Counts an intervention when the gate paused the
    /// run. Resuming a running run changes nothing.
    pub fn resume(&self) -> Result<(), FlowError> {
        self.transition("resume", |snap| match snap.state {
            RunState::Running => Ok(false),
            RunState::Paused => {
                if snap.paused_by == Some(PauseOrigin::Intervention) {
                    snap.intervention_count += 1;
                }
                snap.state = RunState::Running;
                snap.paused_by = None;
                Ok(true)
            }
            _ => Err(()),
        })
    }

    /// {Running, Paused} -> Cancelled. Fires the cancellation token.
    pub fn cancel(&self) -> Result<(), FlowError> {
        self.transition("cancel", |snap| match snap.state {
            RunState::Running | RunState::Paused => {
                snap.state = RunState::Cancelled;
                snap.paused_by = None;
                Ok(true)
            }
            _ => Err(()),
        })?;
        self.cancel.cancel();
        Ok(())
    }

    /// Running -> Completed. A paused run must be resumed first.
    pub fn complete(&self) -> Result<(), FlowError> {
        self.transition("complete", |snap| match snap.state {
            RunState::Running => {
                snap.state = RunState::Completed;
                snap.paused_by = None;
                Ok(true)
            }
            _ => Err(()),
        })
    }

    /// Running -> Failed. A step that fails while the user holds a pause
    /// still ends the run.
    pub fn fail(&self, error: impl Into<String>) -> Result<(), FlowError> {
        let error = error.into();
        self.transition("fail", |snap| match snap.state {
            RunState::Running | RunState::Paused => {
                snap.state = RunState::Failed;
                snap.paused_by = None;
                snap.last_error = Some(error);
                Ok(true)
            }
            _ => Err(()),
        })
    }

    /// Record the step about to run. Indices never move backwards.
    pub fn record_step(&self, index: usize) {
        self.state.send_if_modified(|snap| {
            if snap.step_index.map_or(true, |current| index >= current) {
                snap.step_index = Some(index);
                true
            } else {
                false
            }
        });
    }

    /// Resolves once the run is Running. Fails with [`FlowError::Cancelled`]
    /// when the run is cancelled (or otherwise ends) first.
    pub async fn wait_until_running(&self) -> Result<(), FlowError> {
        let mut rx = self.state.subscribe();
        loop {
            let state = rx.borrow_and_update().state;
            match state {
                RunState::Running => return Ok(()),
                RunState::Idle | RunState::Paused => {}
                _ => return Err(FlowError::Cancelled),
            }
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(FlowError::Cancelled);
                    }
                }
                _ = self.cancel.cancelled() => return Err(FlowError::Cancelled),
            }
        }
    }

    fn transition<F>(&self, request: &'static str, apply: F) -> Result<(), FlowError>
    where
        F: FnOnce(&mut RunSnapshot) -> Result<bool, ()>,
    {
        let mut outcome = Ok(());
        self.state.send_if_modified(|snap| {
            let from = snap.state;
            match apply(snap) {
                Ok(changed) => {
                    if changed {
                        info!(run_id = %snap.run_id, %from, to = %snap.state, request, "run transition");
                    } else {
                        debug!(run_id = %snap.run_id, state = %from, request, "transition is a no-op");
                    }
                    changed
                }
                Err(()) => {
                    outcome = Err(FlowError::InvalidTransition { from, request });
                    false
                }
            }
        });
        outcome
    }
}

#[async_trait]
impl Suspendable for ExecutionRun {
    fn suspend_for_intervention(&self) -> Result<(), GateError> {
        self.transition("suspend", |snap| match snap.state {
            RunState::Running | RunState::Paused => {
                snap.state = RunState::Paused;
                snap.paused_by = Some(PauseOrigin::Intervention);
                Ok(true)
            }
            _ => Err(()),
        })
        .map_err(|err| GateError::Unavailable(err.to_string()))
    }

    async fn wait_until_resumed(&self) -> Result<(), GateError> {
        self.wait_until_running()
            .await
            .map_err(|_| GateError::Cancelled)
    }

    fn abandon_intervention(&self) {
        // Not counted: nobody acted on the page.
        let _ = self.transition("abandon", |snap| match snap.state {
            RunState::Paused => {
                snap.state = RunState::Running;
                snap.paused_by = None;
                Ok(true)
            }
            _ => Err(()),
        });
    }
}
