//! Page collaborator for the autofill engine.
//!
//! The engine never talks to a browser directly. The host environment hands
//! it a [`PageDriver`] that can query the live, script-addressable page and
//! apply DOM effects. [`FixturePage`] is a scripted in-memory implementation
//! used by the CLI and the test suites.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod fixture;

pub use error::{PageError, PageErrorKind};
pub use fixture::{FixtureElement, FixturePage, FixtureSpec, PageInteraction};

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by a page driver.
    #[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum PageErrorKind {
        /// The query string is not valid in the requested query language.
        #[error("query syntax error")]
        QuerySyntax,
        #[error("element detached from the page")]
        Detached,
        #[error("element not interactable")]
        NotInteractable,
        #[error("navigation failed")]
        Navigation,
        #[error("page i/o failure")]
        Io,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PageError {
        pub kind: PageErrorKind,
        pub hint: Option<String>,
    }

    impl fmt::Display for PageError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for PageError {}

    impl PageError {
        pub fn new(kind: PageErrorKind) -> Self {
            Self { kind, hint: None }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn is_syntax(&self) -> bool {
            self.kind == PageErrorKind::QuerySyntax
        }
    }
}

/// Handle to an element found on the page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    /// Driver-specific node identifier.
    pub node_id: String,
}

impl ElementRef {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }
}

/// Notifications raised on an element after its value changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    /// Value is being edited (`input`).
    Input,
    /// Value committed (`change`).
    Change,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
        }
    }
}

/// Vertical alignment used when scrolling an element into view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    Start,
    #[default]
    Center,
    End,
}

/// Live page operations the engine relies on.
///
/// Implementations must be cheap to call repeatedly: the locator polls
/// `query_*` while waiting for elements to appear.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Tree query (CSS-like selector). Must return a `QuerySyntax` error when
    /// the selector cannot be parsed, so callers can fall back to path queries.
    async fn query_structural(&self, selector: &str) -> Result<Option<ElementRef>, PageError>;

    /// Path query expression; returns the first match in document order.
    async fn query_path(&self, expression: &str) -> Result<Option<ElementRef>, PageError>;

    async fn set_value(&self, element: &ElementRef, value: &str) -> Result<(), PageError>;

    async fn dispatch_event(&self, element: &ElementRef, event: DomEvent)
        -> Result<(), PageError>;

    async fn scroll_into_view(
        &self,
        element: &ElementRef,
        align: ScrollAlign,
    ) -> Result<(), PageError>;

    /// Activate the element as a user click would.
    async fn activate(&self, element: &ElementRef) -> Result<(), PageError>;

    /// Change the page location. Returns once navigation has been requested.
    async fn set_location(&self, url: &str) -> Result<(), PageError>;

    /// Resolves when the host reports the current document fully loaded.
    async fn wait_until_loaded(&self) -> Result<(), PageError>;

    async fn current_url(&self) -> Result<String, PageError>;
}
