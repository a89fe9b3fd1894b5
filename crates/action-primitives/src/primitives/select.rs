//! Select primitive - choose an option by value

use chrono::Utc;
use page_adapter::DomEvent;
use tokio::time::Instant;
use tracing::info;

use crate::{
    errors::ActionError,
    primitives::DefaultStepInterpreter,
    types::{ActionReport, ExecCtx},
};

/// Execute select primitive: resolve, set the value, raise `change`.
pub async fn execute_select(
    interpreter: &DefaultStepInterpreter,
    ctx: &ExecCtx,
    target: &str,
    value: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        step_index = ctx.step_index,
        target = %target,
        value = %value,
        "Executing select primitive"
    );

    let resolved = interpreter.resolve_target(ctx, target).await?;
    let page = interpreter.page();

    page.set_value(&resolved.element, value).await?;
    page.dispatch_event(&resolved.element, DomEvent::Change).await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(action_id = %ctx.action_id, latency_ms, "Select completed");

    Ok(ActionReport::success(started_at, latency_ms)
        .with_target(target, resolved.strategy.name()))
}
