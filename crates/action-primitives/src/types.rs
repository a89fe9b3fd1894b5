//! Core data types for the step interpreter

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Execution context for one step attempt
///
/// Carries the run's cancellation token so every suspension inside a
/// primitive can be interrupted, plus identifiers for log correlation.
#[derive(Clone)]
pub struct ExecCtx {
    pub cancel_token: CancellationToken,

    /// Index of the step in its plan
    pub step_index: usize,

    /// Unique identifier for this attempt
    pub action_id: String,
}

impl ExecCtx {
    pub fn new(cancel_token: CancellationToken, step_index: usize) -> Self {
        Self {
            cancel_token,
            step_index,
            action_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Timing knobs for the primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpreterConfig {
    /// Pause between scrolling a click target into view and activating it
    pub click_settle: Duration,

    /// Element wait timeout when the step does not give one
    pub wait_timeout: Duration,

    /// Sleep length for a wait step without target or value
    pub default_sleep: Duration,

    /// Existence polling interval for element waits
    pub poll_interval: Duration,

    /// Ceiling on waiting for a navigation to load. `None` waits forever.
    pub navigation_timeout: Option<Duration>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            click_settle: Duration::from_millis(300),
            wait_timeout: Duration::from_millis(5000),
            default_sleep: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(500),
            navigation_timeout: None,
        }
    }
}

/// What happened while executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub ok: bool,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,

    pub latency_ms: u64,

    /// Target that resolved, when the step had one
    pub used_target: Option<String>,

    /// Resolver strategy that matched
    pub strategy: Option<String>,

    /// Page location after the step, for navigations
    pub url_after: Option<String>,
}

impl ActionReport {
    pub fn success(started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            ok: true,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
            used_target: None,
            strategy: None,
            url_after: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>, strategy: &str) -> Self {
        self.used_target = Some(target.into());
        self.strategy = Some(strategy.to_string());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url_after = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings() {
        let config = InterpreterConfig::default();
        assert_eq!(config.click_settle, Duration::from_millis(300));
        assert_eq!(config.wait_timeout, Duration::from_millis(5000));
        assert_eq!(config.default_sleep, Duration::from_millis(1000));
        assert!(config.navigation_timeout.is_none());
    }

    #[test]
    fn each_context_gets_its_own_id() {
        let token = CancellationToken::new();
        let a = ExecCtx::new(token.clone(), 0);
        let b = ExecCtx::new(token, 0);
        assert_ne!(a.action_id, b.action_id);
    }
}
