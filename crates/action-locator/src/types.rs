//! Core types for target resolution

use std::time::Duration;

use page_adapter::ElementRef;
use serde::{Deserialize, Serialize};

/// Query languages tried for a target, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    /// CSS-like structural selector
    Structural,

    /// Path query expression, first match in document order
    PathQuery,
}

impl LocatorStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Structural => "structural",
            LocatorStrategy::PathQuery => "path-query",
        }
    }

    /// All strategies in fallback order
    pub fn fallback_chain() -> [LocatorStrategy; 2] {
        [LocatorStrategy::Structural, LocatorStrategy::PathQuery]
    }
}

/// Retry budget for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Rounds of strategy attempts before giving up (at least one runs)
    pub rounds: u32,

    /// Pause between rounds
    pub interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            rounds: 5,
            interval: Duration::from_millis(500),
        }
    }
}

impl ResolverConfig {
    pub fn new(rounds: u32, interval: Duration) -> Self {
        Self { rounds, interval }
    }
}

/// Element found for a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub element: ElementRef,

    /// Strategy that produced the match
    pub strategy: LocatorStrategy,

    /// Zero-based round the match happened in
    pub round: u32,

    /// Target string as given
    pub target: String,
}

impl ResolutionResult {
    pub fn new(
        element: ElementRef,
        strategy: LocatorStrategy,
        round: u32,
        target: impl Into<String>,
    ) -> Self {
        Self {
            element,
            strategy,
            round,
            target: target.into(),
        }
    }
}
