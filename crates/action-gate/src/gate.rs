//! Intervention gate
//!
//! Pauses the run, tells the host a human is needed, and waits. The wait is
//! unbounded unless a ceiling is configured; cancellation always ends it.

use std::sync::Arc;

use autofill_core_types::{EngineEvent, Notice, NoticeSeverity};
use autofill_event_bus::{EventBus, NoticeSink};
use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{errors::GateError, types::*};

pub struct InterventionGate {
    events: Arc<dyn EventBus<EngineEvent>>,
    notices: Arc<dyn NoticeSink>,
    config: GateConfig,
}

impl InterventionGate {
    pub fn new(
        events: Arc<dyn EventBus<EngineEvent>>,
        notices: Arc<dyn NoticeSink>,
        config: GateConfig,
    ) -> Self {
        Self {
            events,
            notices,
            config,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Suspend `run` until a human resumes it.
    ///
    /// Fails only when the run cannot be paused; cancellation and expiry are
    /// reported through the returned record's outcome.
    pub async fn hold(
        &self,
        run: &dyn Suspendable,
        request: &InterventionRequest,
    ) -> Result<InterventionRecord, GateError> {
        run.suspend_for_intervention()?;

        let requested_at = Utc::now();
        let started = Instant::now();
        info!(
            step_index = request.step_index,
            reason = ?request.reason,
            message = %request.message,
            "Waiting for user intervention"
        );

        self.events
            .publish(EngineEvent::intervention(request.message.clone()))
            .await;
        self.notices.post(Notice::persistent(
            request.message.clone(),
            NoticeSeverity::Warning,
        ));

        let outcome = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, run.wait_until_resumed()).await {
                Ok(result) => outcome_of(result),
                Err(_) => {
                    warn!(
                        step_index = request.step_index,
                        timeout_ms = limit.as_millis() as u64,
                        "Intervention expired"
                    );
                    run.abandon_intervention();
                    InterventionOutcome::Expired
                }
            },
            None => outcome_of(run.wait_until_resumed().await),
        };

        self.notices.clear();

        let waited_ms = started.elapsed().as_millis() as u64;
        info!(
            step_index = request.step_index,
            outcome = ?outcome,
            waited_ms,
            "Intervention finished"
        );

        Ok(InterventionRecord {
            step_index: request.step_index,
            reason: request.reason,
            message: request.message.clone(),
            requested_at,
            finished_at: Utc::now(),
            waited_ms,
            outcome,
        })
    }
}

fn outcome_of(result: Result<(), GateError>) -> InterventionOutcome {
    match result {
        Ok(()) => InterventionOutcome::Resumed,
        Err(_) => InterventionOutcome::Cancelled,
    }
}

impl InterventionRecord {
    /// The error the run should act on, if the intervention did not resolve.
    pub fn error(&self) -> Option<GateError> {
        match self.outcome {
            InterventionOutcome::Resumed => None,
            InterventionOutcome::Cancelled => Some(GateError::Cancelled),
            InterventionOutcome::Expired => Some(GateError::Expired(self.waited_ms)),
        }
    }
}
