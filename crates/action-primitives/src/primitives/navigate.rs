//! Navigate primitive - change location and wait for load

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    errors::ActionError,
    primitives::DefaultStepInterpreter,
    types::{ActionReport, ExecCtx},
};

/// Execute navigate primitive
///
/// Requests the new location, then suspends until the page reports loaded.
/// The load wait is unbounded unless a navigation ceiling is configured.
pub async fn execute_navigate(
    interpreter: &DefaultStepInterpreter,
    ctx: &ExecCtx,
    url: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        step_index = ctx.step_index,
        url = %url,
        "Executing navigate primitive"
    );

    interpreter.page().set_location(url).await?;

    debug!("Waiting for page load");
    interpreter
        .wait_strategy()
        .page_loaded(interpreter.page().clone(), &ctx.cancel_token)
        .await?;

    let url_after = interpreter.page().current_url().await?;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(
        action_id = %ctx.action_id,
        latency_ms,
        url_after = %url_after,
        "Navigate completed"
    );

    Ok(ActionReport::success(started_at, latency_ms).with_url(url_after))
}
