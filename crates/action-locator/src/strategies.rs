//! Element resolution strategies
//!
//! Two strategies in fallback order:
//! 1. Structural - selector query against the live page
//! 2. Path query - only consulted when the structural engine rejects the
//!    target as malformed

use std::sync::Arc;

use async_trait::async_trait;
use page_adapter::{ElementRef, PageDriver, PageError};
use tracing::debug;

use crate::{errors::LocatorError, types::LocatorStrategy};

/// Outcome of a single strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Found(ElementRef),
    /// Query ran; nothing matches yet.
    Missing,
    /// Target is not valid in this strategy's query language.
    Unparseable(String),
}

/// Strategy trait for element resolution
#[async_trait]
pub trait Strategy: Send + Sync {
    async fn attempt(&self, target: &str) -> Result<StrategyOutcome, LocatorError>;

    fn strategy_type(&self) -> LocatorStrategy;

    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

fn classify(
    strategy: LocatorStrategy,
    result: Result<Option<ElementRef>, PageError>,
) -> Result<StrategyOutcome, LocatorError> {
    match result {
        Ok(Some(element)) => Ok(StrategyOutcome::Found(element)),
        Ok(None) => Ok(StrategyOutcome::Missing),
        Err(err) if err.is_syntax() => Ok(StrategyOutcome::Unparseable(err.to_string())),
        Err(err) => Err(LocatorError::from_page(strategy.name(), err)),
    }
}

/// Structural selector strategy
pub struct StructuralStrategy {
    page: Arc<dyn PageDriver>,
}

impl StructuralStrategy {
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self { page }
    }
}

#[async_trait]
impl Strategy for StructuralStrategy {
    async fn attempt(&self, target: &str) -> Result<StrategyOutcome, LocatorError> {
        debug!(target, "structural query");
        classify(
            LocatorStrategy::Structural,
            self.page.query_structural(target).await,
        )
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Structural
    }
}

/// Path query strategy
pub struct PathQueryStrategy {
    page: Arc<dyn PageDriver>,
}

impl PathQueryStrategy {
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self { page }
    }
}

#[async_trait]
impl Strategy for PathQueryStrategy {
    async fn attempt(&self, target: &str) -> Result<StrategyOutcome, LocatorError> {
        debug!(target, "path query");
        classify(
            LocatorStrategy::PathQuery,
            self.page.query_path(target).await,
        )
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::PathQuery
    }
}
