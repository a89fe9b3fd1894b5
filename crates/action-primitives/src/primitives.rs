//! Step interpreter
//!
//! One primitive per step kind:
//! 1. navigate - set the page location and wait for it to load
//! 2. type_text - set a value and raise `input` and `change`
//! 3. click - scroll into view, settle, activate
//! 4. select - set a value and raise `change`
//! 5. wait - poll for an element or sleep
//!
//! `pause_for_input` never touches the page; it asks for a human.

mod click;
mod navigate;
mod select;
mod type_text;
mod wait;

pub use click::*;
pub use navigate::*;
pub use select::*;
pub use type_text::*;
pub use wait::*;

use std::sync::Arc;

use action_locator::{DefaultElementResolver, ElementResolver, ResolutionResult, ResolverConfig};
use async_trait::async_trait;
use autofill_plan::{PlannedStep, StepAction};
use chrono::Utc;
use page_adapter::PageDriver;
use tracing::warn;

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx, InterpreterConfig},
    waiting::{DefaultWaitStrategy, WaitStrategy},
};

const DEFAULT_PAUSE_MESSAGE: &str = "Manual input required";

/// Executes one validated step against the page.
#[async_trait]
pub trait StepInterpreter: Send + Sync {
    async fn execute(&self, step: &PlannedStep, ctx: &ExecCtx)
        -> Result<ActionReport, ActionError>;
}

/// Default implementation backed by a [`PageDriver`]
pub struct DefaultStepInterpreter {
    page: Arc<dyn PageDriver>,
    resolver: Arc<dyn ElementResolver>,
    wait_strategy: Arc<dyn WaitStrategy>,
    config: InterpreterConfig,
}

impl DefaultStepInterpreter {
    /// Interpreter with the default resolver and timings
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self::with_config(page, InterpreterConfig::default(), ResolverConfig::default())
    }

    pub fn with_config(
        page: Arc<dyn PageDriver>,
        config: InterpreterConfig,
        resolver_config: ResolverConfig,
    ) -> Self {
        let resolver = Arc::new(DefaultElementResolver::with_config(
            page.clone(),
            resolver_config,
        ));
        let wait_strategy = Arc::new(DefaultWaitStrategy::new(config.navigation_timeout));
        Self::with_parts(page, resolver, wait_strategy, config)
    }

    pub fn with_parts(
        page: Arc<dyn PageDriver>,
        resolver: Arc<dyn ElementResolver>,
        wait_strategy: Arc<dyn WaitStrategy>,
        config: InterpreterConfig,
    ) -> Self {
        Self {
            page,
            resolver,
            wait_strategy,
            config,
        }
    }

    pub fn page(&self) -> &Arc<dyn PageDriver> {
        &self.page
    }

    pub fn resolver(&self) -> &Arc<dyn ElementResolver> {
        &self.resolver
    }

    pub fn wait_strategy(&self) -> &Arc<dyn WaitStrategy> {
        &self.wait_strategy
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Resolve a step target with the configured retry rounds
    pub async fn resolve_target(
        &self,
        ctx: &ExecCtx,
        target: &str,
    ) -> Result<ResolutionResult, ActionError> {
        Ok(self.resolver.resolve(target, &ctx.cancel_token).await?)
    }
}

#[async_trait]
impl StepInterpreter for DefaultStepInterpreter {
    async fn execute(
        &self,
        step: &PlannedStep,
        ctx: &ExecCtx,
    ) -> Result<ActionReport, ActionError> {
        if ctx.is_cancelled() {
            return Err(ActionError::Cancelled);
        }

        match &step.action {
            StepAction::Navigate { url } => navigate::execute_navigate(self, ctx, url).await,
            StepAction::Type { target, value } => {
                type_text::execute_type_text(self, ctx, target, value).await
            }
            StepAction::Click { target } => click::execute_click(self, ctx, target).await,
            StepAction::Select { target, value } => {
                select::execute_select(self, ctx, target, value).await
            }
            StepAction::Wait(wait_for) => wait::execute_wait(self, ctx, wait_for).await,
            StepAction::PauseForInput => {
                let message = step.description.trim();
                Err(ActionError::InterventionRequired(if message.is_empty() {
                    DEFAULT_PAUSE_MESSAGE.to_string()
                } else {
                    message.to_string()
                }))
            }
            StepAction::Unknown { kind } => {
                warn!(step_index = ctx.step_index, kind = %kind, "unknown step kind, skipping");
                Ok(ActionReport::success(Utc::now(), 0))
            }
        }
    }
}
