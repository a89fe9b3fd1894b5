//! Built-in waiting for primitives
//!
//! Every wait races the awaited condition against the step's cancellation
//! token, so a cancelled run never sits in a sleep or a page load.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use page_adapter::PageDriver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::ActionError;

/// Waiting strategy trait
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    /// Sleep for `duration` unless cancelled first.
    async fn settle(
        &self,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError>;

    /// Suspend until the page reports it has loaded.
    async fn page_loaded(
        &self,
        page: Arc<dyn PageDriver>,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError>;
}

/// Default waiting strategy implementation
#[derive(Debug, Clone, Default)]
pub struct DefaultWaitStrategy {
    /// Optional ceiling for page loads
    pub load_timeout: Option<Duration>,
}

impl DefaultWaitStrategy {
    pub fn new(load_timeout: Option<Duration>) -> Self {
        Self { load_timeout }
    }
}

#[async_trait]
impl WaitStrategy for DefaultWaitStrategy {
    async fn settle(
        &self,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ActionError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    async fn page_loaded(
        &self,
        page: Arc<dyn PageDriver>,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        let loaded = async {
            match self.load_timeout {
                Some(limit) => match tokio::time::timeout(limit, page.wait_until_loaded()).await {
                    Ok(result) => result.map_err(ActionError::from),
                    Err(_) => {
                        warn!(timeout_ms = limit.as_millis() as u64, "page load timed out");
                        Err(ActionError::Timeout(format!(
                            "Page did not finish loading within {}ms",
                            limit.as_millis()
                        )))
                    }
                },
                None => page.wait_until_loaded().await.map_err(ActionError::from),
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("page load wait cancelled");
                Err(ActionError::Cancelled)
            }
            result = loaded => result,
        }
    }
}
