//! Error types for the intervention gate

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Run was cancelled while waiting for the human
    #[error("Intervention cancelled")]
    Cancelled,

    /// Nobody resumed within the configured ceiling
    #[error("Intervention not resolved within {0}ms")]
    Expired(u64),

    /// The run could not be paused (already terminal or not running)
    #[error("Run cannot be paused: {0}")]
    Unavailable(String),
}
