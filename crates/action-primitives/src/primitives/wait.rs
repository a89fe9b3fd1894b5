//! Wait primitive - element existence or fixed duration

use std::time::Duration;

use autofill_plan::WaitFor;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    errors::ActionError,
    primitives::DefaultStepInterpreter,
    types::{ActionReport, ExecCtx},
};

/// Execute wait primitive
///
/// With a target, polls for the element until it exists or the timeout
/// passes. Without one, sleeps. Both forms stop early on cancellation.
pub async fn execute_wait(
    interpreter: &DefaultStepInterpreter,
    ctx: &ExecCtx,
    wait_for: &WaitFor,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    let config = interpreter.config();

    let report = match wait_for {
        WaitFor::Element { target, timeout_ms } => {
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(config.wait_timeout);
            info!(
                action_id = %ctx.action_id,
                step_index = ctx.step_index,
                target = %target,
                timeout_ms = timeout.as_millis() as u64,
                "Executing wait primitive for element"
            );
            let strategy = wait_for_element(interpreter, ctx, target, timeout).await?;
            ActionReport::success(started_at, start_instant.elapsed().as_millis() as u64)
                .with_target(target.as_str(), strategy)
        }
        WaitFor::Duration { ms } => {
            let duration = ms.map(Duration::from_millis).unwrap_or(config.default_sleep);
            info!(
                action_id = %ctx.action_id,
                step_index = ctx.step_index,
                duration_ms = duration.as_millis() as u64,
                "Executing wait primitive for duration"
            );
            interpreter
                .wait_strategy()
                .settle(duration, &ctx.cancel_token)
                .await?;
            ActionReport::success(started_at, start_instant.elapsed().as_millis() as u64)
        }
    };

    info!(action_id = %ctx.action_id, latency_ms = report.latency_ms, "Wait completed");
    Ok(report)
}

async fn wait_for_element(
    interpreter: &DefaultStepInterpreter,
    ctx: &ExecCtx,
    target: &str,
    timeout: Duration,
) -> Result<&'static str, ActionError> {
    let deadline = Instant::now() + timeout;
    let poll = interpreter.config().poll_interval;

    loop {
        if let Some(found) = interpreter.resolver().probe(target).await? {
            debug!(element = %found.element.node_id, "Element present");
            return Ok(found.strategy.name());
        }

        let now = Instant::now();
        if now >= deadline {
            warn!(target, timeout_ms = timeout.as_millis() as u64, "Element wait timed out");
            return Err(ActionError::Timeout(format!(
                "Timed out waiting for element: {target}"
            )));
        }

        let pause = poll.min(deadline - now);
        interpreter
            .wait_strategy()
            .settle(pause, &ctx.cancel_token)
            .await?;
    }
}
