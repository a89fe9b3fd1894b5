use thiserror::Error;

use crate::types::SubmissionStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Submission not found: {0}")]
    NotFound(String),

    #[error("Submission cannot move from {from} to {to}")]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    /// Backing store failure
    #[error("Submission store error: {0}")]
    Store(String),
}
