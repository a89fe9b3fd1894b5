//! Execution controller error types

use thiserror::Error;

use crate::run::RunState;

/// Controller errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    /// Plan was rejected before the run started
    #[error("{0}")]
    Validation(String),

    /// Another run is still running or paused on this controller
    #[error("A run is already active ({0})")]
    RunActive(RunState),

    /// Requested control edge does not exist from the current state
    #[error("Cannot {request} a run that is {from}")]
    InvalidTransition { from: RunState, request: &'static str },

    /// A step failed and nothing could recover it
    #[error("Failed to execute step: {0}")]
    UnhandledStep(String),

    /// The run was cancelled
    #[error("Autofill cancelled")]
    Cancelled,

    /// Submission bookkeeping failed
    #[error("Submission error: {0}")]
    Submission(String),

    /// The run task ended without producing a report
    #[error("Run task failed: {0}")]
    Internal(String),
}

impl FlowError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FlowError::Cancelled)
    }
}

impl From<autofill_plan::PlanError> for FlowError {
    fn from(err: autofill_plan::PlanError) -> Self {
        FlowError::Validation(err.to_string())
    }
}

impl From<action_primitives::ActionError> for FlowError {
    fn from(err: action_primitives::ActionError) -> Self {
        match err {
            action_primitives::ActionError::Cancelled => FlowError::Cancelled,
            other => FlowError::UnhandledStep(other.reason()),
        }
    }
}

impl From<action_gate::GateError> for FlowError {
    fn from(err: action_gate::GateError) -> Self {
        match err {
            action_gate::GateError::Cancelled => FlowError::Cancelled,
            other => FlowError::UnhandledStep(other.to_string()),
        }
    }
}

impl From<autofill_submission::SubmissionError> for FlowError {
    fn from(err: autofill_submission::SubmissionError) -> Self {
        FlowError::Submission(err.to_string())
    }
}
