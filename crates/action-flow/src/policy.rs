//! Failure policy for one step
//!
//! The interpreter runs the step first. When it fails:
//! 1. `pause_for_input`, or confidence below the threshold: hand the step to
//!    a human through the intervention gate
//! 2. otherwise try each alternative target in order; the first success wins
//! 3. otherwise the run fails; steps are never skipped

use std::sync::Arc;

use action_gate::{InterventionGate, InterventionOutcome, InterventionRequest};
use action_primitives::{ActionError, ExecCtx, StepInterpreter};
use autofill_core_types::SubmissionId;
use autofill_plan::PlannedStep;
use autofill_submission::SubmissionLifecycle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::errors::FlowError;
use crate::run::ExecutionRun;
use crate::types::{RunReport, StepRecord};

pub struct StepPolicy {
    interpreter: Arc<dyn StepInterpreter>,
    gate: Arc<InterventionGate>,
    submissions: Option<SubmissionLifecycle>,
    confidence_threshold: f64,
}

impl StepPolicy {
    pub fn new(
        interpreter: Arc<dyn StepInterpreter>,
        gate: Arc<InterventionGate>,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            interpreter,
            gate,
            submissions: None,
            confidence_threshold,
        }
    }

    pub fn with_submissions(mut self, submissions: Option<SubmissionLifecycle>) -> Self {
        self.submissions = submissions;
        self
    }

    pub fn interpreter(&self) -> &Arc<dyn StepInterpreter> {
        &self.interpreter
    }

    /// Whether a failure of `step` goes to a human instead of alternatives.
    pub fn needs_human(&self, step: &PlannedStep, err: &ActionError) -> bool {
        step.is_pause_for_input()
            || matches!(err, ActionError::InterventionRequired(_))
            || step.confidence < self.confidence_threshold
    }

    /// Execute `step` and recover from failure where possible. The step's
    /// record (and any intervention) lands in `report` either way.
    pub async fn execute_step_with_policy(
        &self,
        step: &PlannedStep,
        run: &ExecutionRun,
        submission: Option<&SubmissionId>,
        report: &mut RunReport,
    ) -> Result<(), FlowError> {
        let ctx = ExecCtx::new(run.cancel_token(), step.index);
        let started = Instant::now();
        let record = StepRecord::new(step.index, step.kind_name());

        let primary_err = match self.interpreter.execute(step, &ctx).await {
            Ok(action) => {
                report.push_step(
                    record
                        .with_report(&action)
                        .with_attempts(1)
                        .with_latency(elapsed_ms(started)),
                );
                return Ok(());
            }
            Err(ActionError::Cancelled) => {
                report.push_step(
                    record
                        .with_attempts(1)
                        .with_latency(elapsed_ms(started))
                        .with_error(ActionError::Cancelled.reason()),
                );
                return Err(FlowError::Cancelled);
            }
            Err(err) => err,
        };

        if self.needs_human(step, &primary_err) {
            let request = match &primary_err {
                ActionError::InterventionRequired(message) => {
                    InterventionRequest::pause_for_input(step.index, message.clone())
                }
                other => InterventionRequest::low_confidence(
                    step.index,
                    &step.description,
                    &other.reason(),
                ),
            };
            let outcome = self.hand_over(run, submission, &request, report).await;
            let record = record
                .with_attempts(1)
                .with_latency(elapsed_ms(started));
            return match outcome {
                Ok(outcome) => {
                    report.push_step(record.with_intervention(outcome));
                    Ok(())
                }
                Err(err) => {
                    report.push_step(record.with_error(err.to_string()));
                    Err(err)
                }
            };
        }

        warn!(
            step_index = step.index,
            kind = step.kind_name(),
            target = step.target().unwrap_or_default(),
            error = %primary_err,
            "Step failed"
        );

        let mut attempts = 1;
        let mut last_err = primary_err;
        for alternative in step
            .alternatives
            .iter()
            .map(|alt| alt.trim())
            .filter(|alt| !alt.is_empty())
        {
            attempts += 1;
            info!(step_index = step.index, target = alternative, "Trying alternative target");
            match self
                .interpreter
                .execute(&step.retargeted(alternative), &ctx)
                .await
            {
                Ok(action) => {
                    let record = record
                        .with_report(&action)
                        .with_attempts(attempts)
                        .with_latency(elapsed_ms(started));
                    let record = if record.used_target.is_none() {
                        StepRecord {
                            used_target: Some(alternative.to_string()),
                            ..record
                        }
                    } else {
                        record
                    };
                    report.push_step(record);
                    return Ok(());
                }
                Err(ActionError::Cancelled) => {
                    report.push_step(
                        record
                            .with_attempts(attempts)
                            .with_latency(elapsed_ms(started))
                            .with_error(ActionError::Cancelled.reason()),
                    );
                    return Err(FlowError::Cancelled);
                }
                Err(err) => {
                    warn!(step_index = step.index, target = alternative, error = %err, "Alternative failed");
                    last_err = err;
                }
            }
        }

        let err = FlowError::from(last_err);
        report.push_step(
            record
                .with_attempts(attempts)
                .with_latency(elapsed_ms(started))
                .with_error(err.to_string()),
        );
        Err(err)
    }

    /// Hold the run at the gate. Resolves with the outcome on resume.
    async fn hand_over(
        &self,
        run: &ExecutionRun,
        submission: Option<&SubmissionId>,
        request: &InterventionRequest,
        report: &mut RunReport,
    ) -> Result<InterventionOutcome, FlowError> {
        let record = match self.gate.hold(run, request).await {
            Ok(record) => record,
            Err(err) if run.is_cancelled() => {
                warn!(step_index = request.step_index, error = %err, "Run ended before the gate could pause it");
                return Err(FlowError::Cancelled);
            }
            Err(err) => return Err(FlowError::UnhandledStep(err.to_string())),
        };

        let outcome = record.outcome;
        let error = record.error();
        report.push_intervention(record);

        if let Some(err) = error {
            return Err(err.into());
        }

        if let (Some(lifecycle), Some(id)) = (&self.submissions, submission) {
            if let Err(err) = lifecycle.record_intervention(id).await {
                warn!(submission_id = %id, error = %err, "Failed to record intervention");
            }
        }
        Ok(outcome)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
