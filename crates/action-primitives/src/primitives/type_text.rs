//! Type text primitive - set an input value as a user edit would

use chrono::Utc;
use page_adapter::DomEvent;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    errors::ActionError,
    primitives::DefaultStepInterpreter,
    types::{ActionReport, ExecCtx},
};

/// Execute type_text primitive
///
/// Steps:
/// 1. Resolve target
/// 2. Set the value
/// 3. Raise `input`, then `change`, so page scripts see the edit
pub async fn execute_type_text(
    interpreter: &DefaultStepInterpreter,
    ctx: &ExecCtx,
    target: &str,
    text: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        step_index = ctx.step_index,
        target = %target,
        text_length = text.len(),
        "Executing type_text primitive"
    );

    let resolved = interpreter.resolve_target(ctx, target).await?;
    let page = interpreter.page();

    debug!(element = %resolved.element.node_id, "Setting value");
    page.set_value(&resolved.element, text).await?;
    page.dispatch_event(&resolved.element, DomEvent::Input).await?;
    page.dispatch_event(&resolved.element, DomEvent::Change).await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(action_id = %ctx.action_id, latency_ms, "Type text completed");

    Ok(ActionReport::success(started_at, latency_ms)
        .with_target(target, resolved.strategy.name()))
}
