//! Plan error types

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    /// Plan failed structural validation; one entry per violation.
    #[error("Plan validation failed: {}", .0.join(" | "))]
    Validation(Vec<String>),

    /// Plan source could not be decoded.
    #[error("Plan could not be parsed: {0}")]
    Parse(String),
}

impl PlanError {
    pub fn errors(&self) -> &[String] {
        match self {
            PlanError::Validation(errors) => errors,
            PlanError::Parse(_) => &[],
        }
    }
}
