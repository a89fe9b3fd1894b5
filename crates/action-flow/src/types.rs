//! Run reports

use action_gate::{InterventionOutcome, InterventionRecord};
use action_primitives::ActionReport;
use autofill_core_types::{RunId, SubmissionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run::RunState;

/// Summary of one run, produced when it ends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: RunId,

    /// Terminal state: completed, failed or cancelled
    pub state: RunState,

    pub total_steps: usize,

    /// Steps that were started, including the one that failed
    pub steps_executed: usize,

    pub steps: Vec<StepRecord>,
    pub intervention_count: u32,
    pub interventions: Vec<InterventionRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<SubmissionId>,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    pub duration_ms: u64,
}

impl RunReport {
    pub fn new(run_id: RunId, total_steps: usize) -> Self {
        Self {
            run_id,
            state: RunState::Running,
            total_steps,
            steps_executed: 0,
            steps: Vec::new(),
            intervention_count: 0,
            interventions: Vec::new(),
            last_error: None,
            submission_id: None,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
        }
    }

    pub fn with_submission(mut self, id: Option<SubmissionId>) -> Self {
        self.submission_id = id;
        self
    }

    pub fn with_step(mut self, record: StepRecord) -> Self {
        self.push_step(record);
        self
    }

    pub fn push_step(&mut self, record: StepRecord) {
        self.steps_executed = self.steps_executed.max(record.index + 1);
        self.steps.push(record);
    }

    pub fn push_intervention(&mut self, record: InterventionRecord) {
        self.interventions.push(record);
    }

    /// Stamp the terminal state and timing
    pub fn finish(mut self, state: RunState, intervention_count: u32, error: Option<String>) -> Self {
        let finished_at = Utc::now();
        self.state = state;
        self.intervention_count = intervention_count;
        self.last_error = error;
        self.duration_ms = (finished_at - self.started_at).num_milliseconds().max(0) as u64;
        self.finished_at = Some(finished_at);
        self
    }

    pub fn succeeded(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// What happened to one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub index: usize,
    pub kind: String,
    pub success: bool,

    /// Target that worked, which may be an alternative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_target: Option<String>,

    /// Interpreter executions, primary plus alternatives
    pub attempts: u32,
    pub latency_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Set when the step was handed to a human
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervention: Option<InterventionOutcome>,
}

impl StepRecord {
    pub fn new(index: usize, kind: impl Into<String>) -> Self {
        Self {
            index,
            kind: kind.into(),
            success: false,
            used_target: None,
            attempts: 0,
            latency_ms: 0,
            error: None,
            intervention: None,
        }
    }

    pub fn with_report(mut self, report: &ActionReport) -> Self {
        self.success = report.ok;
        if report.used_target.is_some() {
            self.used_target = report.used_target.clone();
        }
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    /// The human finished the step (or gave up on it).
    pub fn with_intervention(mut self, outcome: InterventionOutcome) -> Self {
        self.success = outcome == InterventionOutcome::Resumed;
        self.intervention = Some(outcome);
        self
    }
}
