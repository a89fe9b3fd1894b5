//! Execution controller
//!
//! Owns at most one active [`ExecutionRun`] per page context. `start`
//! validates the plan and spawns the run task; `pause`, `resume` and
//! `cancel` act on the current run from any task.

use std::sync::Arc;

use action_gate::InterventionGate;
use action_primitives::{DefaultStepInterpreter, StepInterpreter};
use autofill_core_types::{
    DealerId, EngineEvent, Notice, NoticeSeverity, PageContextId, RunId, SubmissionId,
};
use autofill_event_bus::{EventBus, NoticeSink};
use autofill_plan::{Plan, PlanValidator, ValidatedPlan};
use autofill_submission::{RunOutcome, Submission, SubmissionLifecycle};
use page_adapter::PageDriver;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::errors::FlowError;
use crate::policy::StepPolicy;
use crate::run::{ExecutionRun, RunSnapshot, RunState};
use crate::types::RunReport;

const COMPLETED_MESSAGE: &str = "Autofill completed successfully";

/// Progress for step `index` of `total`, rounded half up.
pub fn progress_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (200 * (index + 1) + total) / (2 * total);
    percent.min(100) as u8
}

/// Everything the run task needs, shared with the controller.
struct RunServices {
    policy: StepPolicy,
    events: Arc<dyn EventBus<EngineEvent>>,
    notices: Arc<dyn NoticeSink>,
    submissions: Option<SubmissionLifecycle>,
    config: EngineConfig,
}

pub struct ExecutionController {
    page_context: PageContextId,
    validator: PlanValidator,
    services: Arc<RunServices>,
    current: Mutex<Option<Arc<ExecutionRun>>>,
}

impl ExecutionController {
    pub fn new(
        interpreter: Arc<dyn StepInterpreter>,
        events: Arc<dyn EventBus<EngineEvent>>,
        notices: Arc<dyn NoticeSink>,
        config: EngineConfig,
    ) -> Self {
        Self::build(interpreter, events, notices, config, None)
    }

    /// Controller driving `page` with the default interpreter.
    pub fn for_page(
        page: Arc<dyn PageDriver>,
        events: Arc<dyn EventBus<EngineEvent>>,
        notices: Arc<dyn NoticeSink>,
        config: EngineConfig,
    ) -> Self {
        let interpreter = Arc::new(DefaultStepInterpreter::with_config(
            page,
            config.interpreter(),
            config.resolver(),
        ));
        Self::new(interpreter, events, notices, config)
    }

    /// Mirror run outcomes and interventions into submissions.
    pub fn with_submissions(self, submissions: SubmissionLifecycle) -> Self {
        let interpreter = self.services.policy.interpreter().clone();
        let events = self.services.events.clone();
        let notices = self.services.notices.clone();
        let config = self.services.config.clone();
        Self {
            page_context: self.page_context,
            validator: self.validator,
            ..Self::build(interpreter, events, notices, config, Some(submissions))
        }
    }

    /// Also reject non-integer wait values and blank alternatives.
    pub fn with_strict_validation(mut self) -> Self {
        self.validator = PlanValidator::strict();
        self
    }

    fn build(
        interpreter: Arc<dyn StepInterpreter>,
        events: Arc<dyn EventBus<EngineEvent>>,
        notices: Arc<dyn NoticeSink>,
        config: EngineConfig,
        submissions: Option<SubmissionLifecycle>,
    ) -> Self {
        let gate = Arc::new(InterventionGate::new(
            events.clone(),
            notices.clone(),
            config.gate(),
        ));
        let policy = StepPolicy::new(interpreter, gate, config.confidence_threshold)
            .with_submissions(submissions.clone());
        Self {
            page_context: PageContextId::new(),
            validator: PlanValidator::default(),
            services: Arc::new(RunServices {
                policy,
                events,
                notices,
                submissions,
                config,
            }),
            current: Mutex::new(None),
        }
    }

    pub fn page_context(&self) -> &PageContextId {
        &self.page_context
    }

    pub fn config(&self) -> &EngineConfig {
        &self.services.config
    }

    /// Open the pending submission a run will report into.
    pub async fn open_submission(
        &self,
        dealer_id: DealerId,
        lender_name: &str,
    ) -> Result<Submission, FlowError> {
        let lifecycle = self.services.submissions.as_ref().ok_or_else(|| {
            FlowError::Submission("controller has no submission store".to_string())
        })?;
        Ok(lifecycle.open(dealer_id, lender_name).await?)
    }

    /// Validate `plan` and start executing it.
    pub fn start(&self, plan: Plan) -> Result<RunHandle, FlowError> {
        self.start_run(plan, None)
    }

    /// Like [`start`](Self::start), mirroring the run into `submission`.
    pub fn start_for_submission(
        &self,
        plan: Plan,
        submission: SubmissionId,
    ) -> Result<RunHandle, FlowError> {
        self.start_run(plan, Some(submission))
    }

    fn start_run(
        &self,
        plan: Plan,
        submission: Option<SubmissionId>,
    ) -> Result<RunHandle, FlowError> {
        let mut current = self.current.lock();
        if let Some(active) = current.as_ref() {
            let state = active.state();
            if state.is_active() {
                return Err(FlowError::RunActive(state));
            }
        }

        let plan = self.validator.validate_into(plan).map_err(|err| {
            warn!(page_context = %self.page_context, error = %err, "Plan rejected");
            FlowError::from(err)
        })?;
        for warning in plan.warnings() {
            warn!(page_context = %self.page_context, "Plan warning: {}", warning);
        }

        let run = Arc::new(ExecutionRun::new(plan.len()));
        run.start()?;
        info!(
            page_context = %self.page_context,
            run_id = %run.id(),
            steps = plan.len(),
            captcha_likely = plan.captcha_likely(),
            "Run started"
        );

        let task = tokio::spawn(drive(
            self.services.clone(),
            run.clone(),
            plan,
            submission,
        ));
        *current = Some(run.clone());
        Ok(RunHandle { run, task })
    }

    pub fn pause(&self) -> Result<(), FlowError> {
        self.with_current("pause", |run| run.pause())
    }

    /// Continue a paused run. A no-op while running.
    pub fn resume(&self) -> Result<(), FlowError> {
        self.with_current("resume", |run| run.resume())
    }

    pub fn cancel(&self) -> Result<(), FlowError> {
        self.with_current("cancel", |run| run.cancel())
    }

    /// State of the current run, or `None` before the first start.
    pub fn snapshot(&self) -> Option<RunSnapshot> {
        self.current.lock().as_ref().map(|run| run.snapshot())
    }

    pub fn state(&self) -> RunState {
        self.current
            .lock()
            .as_ref()
            .map_or(RunState::Idle, |run| run.state())
    }

    fn with_current<F>(&self, request: &'static str, f: F) -> Result<(), FlowError>
    where
        F: FnOnce(&ExecutionRun) -> Result<(), FlowError>,
    {
        let run = self.current.lock().clone();
        match run {
            Some(run) => f(&run),
            None => Err(FlowError::InvalidTransition {
                from: RunState::Idle,
                request,
            }),
        }
    }
}

/// Handle to a started run
pub struct RunHandle {
    run: Arc<ExecutionRun>,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    pub fn run_id(&self) -> &RunId {
        self.run.id()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.run.snapshot()
    }

    /// Watch state changes of this run
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.run.subscribe()
    }

    /// Wait for the run to end
    pub async fn wait(self) -> Result<RunReport, FlowError> {
        self.task
            .await
            .map_err(|err| FlowError::Internal(err.to_string()))
    }
}

/// The run task: steps in order, then exactly one terminal event.
async fn drive(
    services: Arc<RunServices>,
    run: Arc<ExecutionRun>,
    plan: ValidatedPlan,
    submission: Option<SubmissionId>,
) -> RunReport {
    let mut report = RunReport::new(run.id().clone(), plan.len()).with_submission(submission.clone());
    let result = execute_steps(&services, &run, &plan, submission.as_ref(), &mut report).await;

    let (state, error) = settle_outcome(&run, result).await;
    let intervention_count = run.intervention_count();

    let (success, message) = match state {
        RunState::Completed => (true, COMPLETED_MESSAGE.to_string()),
        RunState::Cancelled => (false, FlowError::Cancelled.to_string()),
        _ => (false, error.clone().unwrap_or_default()),
    };
    services
        .events
        .publish(EngineEvent::complete(success, message.clone()))
        .await;

    if state == RunState::Failed {
        error!(run_id = %run.id(), error = %message, "Run failed");
        services.notices.post(Notice::new(
            message.clone(),
            NoticeSeverity::Error,
            services.config.error_notice_dismiss_ms,
        ));
    } else {
        info!(run_id = %run.id(), state = %state, interventions = intervention_count, "Run finished");
    }

    if let (Some(lifecycle), Some(id)) = (&services.submissions, &submission) {
        let outcome = match state {
            RunState::Completed => RunOutcome::Completed {
                interventions: intervention_count,
            },
            RunState::Cancelled => RunOutcome::Cancelled {
                message: message.clone(),
                interventions: intervention_count,
            },
            _ => RunOutcome::Failed {
                error: message.clone(),
                interventions: intervention_count,
            },
        };
        if let Err(err) = lifecycle.apply_outcome(id, &outcome).await {
            warn!(submission_id = %id, error = %err, "Failed to update submission");
        }
    }

    report.finish(state, intervention_count, error)
}

async fn execute_steps(
    services: &RunServices,
    run: &ExecutionRun,
    plan: &ValidatedPlan,
    submission: Option<&SubmissionId>,
    report: &mut RunReport,
) -> Result<(), FlowError> {
    let total = plan.len();
    let cancel = run.cancel_token();

    for step in plan.steps() {
        if cancel.is_cancelled() {
            return Err(FlowError::Cancelled);
        }
        run.wait_until_running().await?;

        run.record_step(step.index);
        services
            .events
            .publish(EngineEvent::progress(
                progress_percent(step.index, total),
                step.status_message(),
            ))
            .await;
        info!(
            run_id = %run.id(),
            step_index = step.index,
            kind = step.kind_name(),
            target = step.target().unwrap_or_default(),
            confidence = step.confidence,
            "Executing step"
        );

        services
            .policy
            .execute_step_with_policy(step, run, submission, report)
            .await?;

        tokio::select! {
            _ = tokio::time::sleep(services.config.settle_delay()) => {}
            _ = cancel.cancelled() => return Err(FlowError::Cancelled),
        }
    }

    // A pause requested during the last step holds completion too.
    run.wait_until_running().await
}

/// Apply the loop result to the run state. Returns the terminal state and
/// the failure message, if any.
async fn settle_outcome(
    run: &ExecutionRun,
    result: Result<(), FlowError>,
) -> (RunState, Option<String>) {
    match result {
        Ok(()) => loop {
            match run.complete() {
                Ok(()) => break (RunState::Completed, None),
                // Paused again after the last step; completion waits for resume.
                Err(_) if run.state() == RunState::Paused => {
                    if run.wait_until_running().await.is_err() {
                        break (run.state(), run.snapshot().last_error);
                    }
                }
                // Cancelled between the last step and completion.
                Err(_) => break (run.state(), run.snapshot().last_error),
            }
        },
        Err(FlowError::Cancelled) => {
            if run.state().is_active() {
                let _ = run.cancel();
            }
            (RunState::Cancelled, None)
        }
        Err(err) => {
            let message = err.to_string();
            match run.fail(message.clone()) {
                Ok(()) => (RunState::Failed, Some(message)),
                Err(_) => (run.state(), run.snapshot().last_error),
            }
        }
    }
}
