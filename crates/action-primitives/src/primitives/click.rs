//! Click primitive - scroll into view, settle, activate

use chrono::Utc;
use page_adapter::ScrollAlign;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    errors::ActionError,
    primitives::DefaultStepInterpreter,
    types::{ActionReport, ExecCtx},
};

/// Execute click primitive
///
/// Steps:
/// 1. Resolve target
/// 2. Scroll it to the center of the viewport
/// 3. Let scrolling settle (cancellable)
/// 4. Activate
pub async fn execute_click(
    interpreter: &DefaultStepInterpreter,
    ctx: &ExecCtx,
    target: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        step_index = ctx.step_index,
        target = %target,
        "Executing click primitive"
    );

    let resolved = interpreter.resolve_target(ctx, target).await?;
    let page = interpreter.page();

    page.scroll_into_view(&resolved.element, ScrollAlign::Center).await?;

    debug!(
        settle_ms = interpreter.config().click_settle.as_millis() as u64,
        "Settling before click"
    );
    interpreter
        .wait_strategy()
        .settle(interpreter.config().click_settle, &ctx.cancel_token)
        .await?;

    page.activate(&resolved.element).await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(action_id = %ctx.action_id, latency_ms, "Click completed");

    Ok(ActionReport::success(started_at, latency_ms)
        .with_target(target, resolved.strategy.name()))
}
