//! Core types for the intervention gate

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GateError;

/// Why a step was handed to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionReason {
    /// The plan asked for manual input
    PauseForInput,

    /// The step failed and the generator was not confident about it
    LowConfidence,
}

/// Request to pause for a human.
#[derive(Debug, Clone, PartialEq)]
pub struct InterventionRequest {
    pub step_index: usize,
    pub reason: InterventionReason,

    /// Text shown to the user
    pub message: String,
}

impl InterventionRequest {
    pub fn pause_for_input(step_index: usize, message: impl Into<String>) -> Self {
        Self {
            step_index,
            reason: InterventionReason::PauseForInput,
            message: message.into(),
        }
    }

    /// Low-confidence failure; the message names the step and the failure.
    pub fn low_confidence(step_index: usize, description: &str, failure: &str) -> Self {
        let what = if description.trim().is_empty() {
            format!("step {}", step_index + 1)
        } else {
            description.trim().to_string()
        };
        Self {
            step_index,
            reason: InterventionReason::LowConfidence,
            message: format!("Please complete \"{what}\" manually ({failure}), then resume"),
        }
    }
}

/// How an intervention ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionOutcome {
    Resumed,
    Cancelled,
    Expired,
}

/// Audit entry for one intervention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub step_index: usize,
    pub reason: InterventionReason,
    pub message: String,
    pub requested_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub waited_ms: u64,
    pub outcome: InterventionOutcome,
}

/// Gate settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateConfig {
    /// Ceiling on waiting for a human. `None` waits until resume or cancel.
    pub timeout: Option<Duration>,
}

/// The run the gate suspends.
///
/// Implemented by the execution controller's run state so the gate can
/// pause it without owning it.
#[async_trait]
pub trait Suspendable: Send + Sync {
    /// Running -> Paused, flagged as gate-originated.
    fn suspend_for_intervention(&self) -> Result<(), GateError>;

    /// Resolves once the run is running again, or fails with
    /// [`GateError::Cancelled`] when it is cancelled first.
    async fn wait_until_resumed(&self) -> Result<(), GateError>;

    /// Paused -> Running without counting an intervention. Used when the
    /// gate gives up waiting.
    fn abandon_intervention(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_confidence_message_names_step() {
        let request = InterventionRequest::low_confidence(2, "Enter SSN", "Element not found: #ssn");
        assert_eq!(request.reason, InterventionReason::LowConfidence);
        assert!(request.message.contains("Enter SSN"));
        assert!(request.message.contains("#ssn"));

        let unnamed = InterventionRequest::low_confidence(2, "  ", "boom");
        assert!(unnamed.message.contains("step 3"));
    }
}
