//! Engine timing and policy settings

use std::time::Duration;

use action_gate::GateConfig;
use action_locator::ResolverConfig;
use action_primitives::InterpreterConfig;
use serde::{Deserialize, Serialize};

/// Engine settings. Every field has a default, so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Element wait polling interval
    pub poll_interval_ms: u64,

    /// Pause between steps
    pub settle_delay_ms: u64,

    /// Pause between scrolling a click target into view and activating it
    pub click_settle_ms: u64,

    pub resolver_rounds: u32,
    pub resolver_interval_ms: u64,

    /// Element wait timeout when a wait step gives none
    pub wait_timeout_ms: u64,

    /// Sleep length for a wait step without target or value
    pub default_sleep_ms: u64,

    /// Failed steps below this confidence go to a human before alternatives
    pub confidence_threshold: f64,

    /// Ceiling on navigation loads; unset waits forever
    pub navigation_timeout_ms: Option<u64>,

    /// Ceiling on waiting for a human; unset waits forever
    pub intervention_timeout_ms: Option<u64>,

    /// Auto-dismiss delay of the notice posted when a run fails
    pub error_notice_dismiss_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            settle_delay_ms: 500,
            click_settle_ms: 300,
            resolver_rounds: 5,
            resolver_interval_ms: 500,
            wait_timeout_ms: 5000,
            default_sleep_ms: 1000,
            confidence_threshold: 0.7,
            navigation_timeout_ms: None,
            intervention_timeout_ms: None,
            error_notice_dismiss_ms: 8000,
        }
    }
}

impl EngineConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn interpreter(&self) -> InterpreterConfig {
        InterpreterConfig {
            click_settle: Duration::from_millis(self.click_settle_ms),
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
            default_sleep: Duration::from_millis(self.default_sleep_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            navigation_timeout: self.navigation_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig::new(
            self.resolver_rounds.max(1),
            Duration::from_millis(self.resolver_interval_ms),
        )
    }

    pub fn gate(&self) -> GateConfig {
        GateConfig {
            timeout: self.intervention_timeout_ms.map(Duration::from_millis),
        }
    }
}
