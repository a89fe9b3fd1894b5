use std::fmt;

use uuid::Uuid;

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DealerId(pub String);

impl DealerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Identifies the page context a controller drives. One active run per context.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PageContextId(pub String);

impl PageContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DealerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PageContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Events the engine emits towards the host UI or relay process.
///
/// Delivery is fire-and-forget; a host that is not listening is not an error.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(tag = "type", rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Progress of the active run, 0-100.
    UpdateProgress { progress: u8, status: String },

    /// Terminal outcome of a run. Emitted exactly once per run.
    AutofillComplete { success: bool, message: String },

    /// The run paused and waits for a human to act on the page.
    RequiresUserIntervention { message: String },
}

impl EngineEvent {
    pub fn progress(progress: u8, status: impl Into<String>) -> Self {
        Self::UpdateProgress {
            progress: progress.min(100),
            status: status.into(),
        }
    }

    pub fn complete(success: bool, message: impl Into<String>) -> Self {
        Self::AutofillComplete {
            success,
            message: message.into(),
        }
    }

    pub fn intervention(message: impl Into<String>) -> Self {
        Self::RequiresUserIntervention {
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::UpdateProgress { .. } => "updateProgress",
            EngineEvent::AutofillComplete { .. } => "autofillComplete",
            EngineEvent::RequiresUserIntervention { .. } => "requiresUserIntervention",
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeSeverity {
    Info,
    Success,
    Warning,
    Error,
}

/// User-facing notice handed to the host's notice surface.
///
/// `auto_dismiss_ms == 0` keeps the notice up until it is cleared explicitly.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub message: String,
    pub severity: NoticeSeverity,
    pub auto_dismiss_ms: u64,
}

impl Notice {
    pub fn new(message: impl Into<String>, severity: NoticeSeverity, auto_dismiss_ms: u64) -> Self {
        Self {
            message: message.into(),
            severity,
            auto_dismiss_ms,
        }
    }

    /// Notice that stays until cleared; used for interventions.
    pub fn persistent(message: impl Into<String>, severity: NoticeSeverity) -> Self {
        Self::new(message, severity, 0)
    }

    pub fn is_persistent(&self) -> bool {
        self.auto_dismiss_ms == 0
    }
}
