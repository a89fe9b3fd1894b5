//! Error types for step execution

use action_locator::LocatorError;
use page_adapter::PageError;
use thiserror::Error;

/// Why a step did not complete
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// A bounded wait ran out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Target did not resolve to an element
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Step needs a human before the run can continue
    #[error("User intervention required: {0}")]
    InterventionRequired(String),

    /// Run was cancelled while the step was suspended
    #[error("Operation cancelled")]
    Cancelled,

    /// Page rejected an effect
    #[error("Page error: {0}")]
    Page(String),
}

impl ActionError {
    /// Short message without the category prefix, used in failure text.
    pub fn reason(&self) -> String {
        match self {
            ActionError::Timeout(msg)
            | ActionError::InterventionRequired(msg)
            | ActionError::Page(msg) => msg.clone(),
            ActionError::ElementNotFound(target) => format!("Element not found: {target}"),
            ActionError::Cancelled => "Operation cancelled".to_string(),
        }
    }
}

impl From<LocatorError> for ActionError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::ElementNotFound(target) => ActionError::ElementNotFound(target),
            LocatorError::Cancelled => ActionError::Cancelled,
            other => ActionError::Page(other.to_string()),
        }
    }
}

impl From<PageError> for ActionError {
    fn from(err: PageError) -> Self {
        ActionError::Page(err.to_string())
    }
}
