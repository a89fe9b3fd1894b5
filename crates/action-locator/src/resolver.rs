//! Target resolver with bounded retry rounds

use std::sync::Arc;

use async_trait::async_trait;
use page_adapter::PageDriver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{errors::LocatorError, strategies::*, types::*};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve a target, retrying until found, out of rounds, or cancelled.
    async fn resolve(
        &self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolutionResult, LocatorError>;

    /// Single round without waiting; `None` when nothing matches right now.
    async fn probe(&self, target: &str) -> Result<Option<ResolutionResult>, LocatorError>;
}

/// Default resolver: structural strategy, then path query on syntax errors.
pub struct DefaultElementResolver {
    chain: Vec<Arc<dyn Strategy>>,
    config: ResolverConfig,
}

impl DefaultElementResolver {
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self::with_config(page, ResolverConfig::default())
    }

    pub fn with_config(page: Arc<dyn PageDriver>, config: ResolverConfig) -> Self {
        Self {
            chain: vec![
                Arc::new(StructuralStrategy::new(page.clone())),
                Arc::new(PathQueryStrategy::new(page)),
            ],
            config,
        }
    }

    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// One pass over the strategy chain. `Ok(None)` means nothing matches
    /// yet; a page failure or a target no strategy can parse is an error.
    async fn run_round(
        &self,
        target: &str,
        round: u32,
    ) -> Result<Option<ResolutionResult>, LocatorError> {
        let mut rejection = None;
        for strategy in &self.chain {
            match strategy.attempt(target).await {
                Ok(StrategyOutcome::Found(element)) => {
                    return Ok(Some(ResolutionResult::new(
                        element,
                        strategy.strategy_type(),
                        round,
                        target,
                    )));
                }
                Ok(StrategyOutcome::Missing) => return Ok(None),
                Ok(StrategyOutcome::Unparseable(reason)) => {
                    debug!(
                        target,
                        strategy = strategy.name(),
                        %reason,
                        "target not valid for strategy, falling back"
                    );
                    rejection = Some(reason);
                }
                Err(err) => {
                    warn!(target, strategy = strategy.name(), error = %err, "strategy failed");
                    return Err(err);
                }
            }
        }
        Err(LocatorError::InvalidTarget {
            target: target.to_string(),
            reason: rejection.unwrap_or_else(|| "no strategy accepted the target".to_string()),
        })
    }
}

#[async_trait]
impl ElementResolver for DefaultElementResolver {
    async fn resolve(
        &self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolutionResult, LocatorError> {
        let rounds = self.config.rounds.max(1);

        for round in 0..rounds {
            if cancel.is_cancelled() {
                return Err(LocatorError::Cancelled);
            }

            if let Some(result) = self.run_round(target, round).await? {
                info!(
                    target,
                    strategy = result.strategy.name(),
                    round,
                    element = %result.element.node_id,
                    "target resolved"
                );
                return Ok(result);
            }

            debug!(target, round, "no match this round");
            if round + 1 < rounds {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LocatorError::Cancelled),
                    _ = tokio::time::sleep(self.config.interval) => {}
                }
            }
        }

        Err(LocatorError::ElementNotFound(target.to_string()))
    }

    async fn probe(&self, target: &str) -> Result<Option<ResolutionResult>, LocatorError> {
        self.run_round(target, 0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::{ElementRef, FixtureElement, FixturePage};
    use std::time::Duration;
    use tokio::time::Instant;

    fn page() -> Arc<FixturePage> {
        Arc::new(
            FixturePage::new("https://lender.example/apply")
                .with_element(
                    FixtureElement::new("income")
                        .selector("#income")
                        .path("//input[@name='income']"),
                )
                .with_element(FixtureElement::new("late").selector("#late").appears_after_ms(1_200)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_structural_on_first_round() {
        let resolver = DefaultElementResolver::new(page());
        let result =
            tokio_test::assert_ok!(resolver.resolve("#income", &CancellationToken::new()).await);
        assert_eq!(result.element, ElementRef::new("income"));
        assert_eq!(result.strategy, LocatorStrategy::Structural);
        assert_eq!(result.round, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_path_query_on_syntax_error() {
        let resolver = DefaultElementResolver::new(page());
        let result = resolver
            .resolve("//input[@name='income']", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.strategy, LocatorStrategy::PathQuery);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_element_appears() {
        let resolver = DefaultElementResolver::new(page());
        let started = Instant::now();
        let result = resolver
            .resolve("#late", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.round, 3);
        assert_eq!(started.elapsed(), Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_configured_rounds() {
        let resolver = DefaultElementResolver::new(page());
        let started = Instant::now();
        let err = resolver
            .resolve("#missing", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::ElementNotFound(ref t) if t == "#missing"));
        assert_eq!(started.elapsed(), Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_rounds() {
        let resolver = DefaultElementResolver::new(page());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            trigger.cancel();
        });

        let err = resolver.resolve("#missing", &cancel).await.unwrap_err();
        assert!(matches!(err, LocatorError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn unparseable_target_fails_without_retrying() {
        let resolver = DefaultElementResolver::new(page());
        let started = Instant::now();
        let err = resolver
            .resolve("#income[", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::InvalidTarget { ref target, .. } if target == "#income["));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    struct DetachedStrategy;

    #[async_trait]
    impl Strategy for DetachedStrategy {
        async fn attempt(&self, _target: &str) -> Result<StrategyOutcome, LocatorError> {
            Err(LocatorError::from_page(
                "structural",
                page_adapter::PageError::new(page_adapter::PageErrorKind::Detached),
            ))
        }

        fn strategy_type(&self) -> LocatorStrategy {
            LocatorStrategy::Structural
        }
    }

    #[tokio::test(start_paused = true)]
    async fn page_failure_is_not_reported_as_missing() {
        let resolver = DefaultElementResolver {
            chain: vec![Arc::new(DetachedStrategy)],
            config: ResolverConfig::default(),
        };
        let started = Instant::now();
        let err = resolver
            .resolve("#income", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::StrategyFailed { ref strategy, .. } if strategy == "structural"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn probe_does_not_wait() {
        let resolver = DefaultElementResolver::new(page());
        assert!(resolver.probe("#late").await.unwrap().is_none());
        assert!(resolver.probe("#income").await.unwrap().is_some());
    }
}
