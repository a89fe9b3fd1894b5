//! Error types for target resolution

use page_adapter::PageError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// No strategy matched within the configured rounds
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Target rejected by every query language
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Strategy execution failed
    #[error("Strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// Resolution interrupted by run cancellation
    #[error("Resolution cancelled")]
    Cancelled,
}

impl LocatorError {
    pub(crate) fn from_page(strategy: &str, err: PageError) -> Self {
        LocatorError::StrategyFailed {
            strategy: strategy.to_string(),
            reason: err.to_string(),
        }
    }
}
