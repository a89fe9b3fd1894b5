use std::sync::Arc;

use autofill_core_types::{DealerId, SubmissionId};
use tracing::{info, warn};

use crate::errors::SubmissionError;
use crate::store::SubmissionStore;
use crate::types::{NewSubmission, RunOutcome, StatusExtra, Submission, SubmissionStatus};

/// Applies run outcomes and manual reviews to stored submissions.
#[derive(Clone)]
pub struct SubmissionLifecycle {
    store: Arc<dyn SubmissionStore>,
}

impl SubmissionLifecycle {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    /// Create the pending submission a run will report into.
    pub async fn open(
        &self,
        dealer_id: DealerId,
        lender_name: impl Into<String>,
    ) -> Result<Submission, SubmissionError> {
        self.store
            .create_submission(NewSubmission::new(dealer_id, lender_name))
            .await
    }

    /// A human resolved an intervention.
    pub async fn record_intervention(
        &self,
        id: &SubmissionId,
    ) -> Result<Submission, SubmissionError> {
        self.store.increment_user_interventions(id).await
    }

    /// Raise the stored counter to `observed` if it is behind. Never lowers it.
    pub async fn sync_interventions(
        &self,
        id: &SubmissionId,
        observed: u32,
    ) -> Result<Submission, SubmissionError> {
        let mut current = self.store.get_submission(id).await?;
        while current.user_interventions < observed {
            current = self.store.increment_user_interventions(id).await?;
        }
        Ok(current)
    }

    /// Mirror a finished run into its submission.
    pub async fn apply_outcome(
        &self,
        id: &SubmissionId,
        outcome: &RunOutcome,
    ) -> Result<Submission, SubmissionError> {
        self.sync_interventions(id, outcome.interventions()).await?;

        let (status, extra) = match outcome {
            RunOutcome::Completed { .. } => {
                (SubmissionStatus::Submitted, StatusExtra::submitted_now())
            }
            RunOutcome::Failed { error, .. } => (SubmissionStatus::Error, StatusExtra::error(error)),
            RunOutcome::Cancelled { message, .. } => {
                (SubmissionStatus::Error, StatusExtra::error(message))
            }
        };

        let submission = self.transition(id, status, extra).await?;
        info!(
            id = %id,
            status = %submission.status,
            interventions = submission.user_interventions,
            "submission updated from run outcome"
        );
        Ok(submission)
    }

    /// Manual lender decision on a submitted application.
    pub async fn review(
        &self,
        id: &SubmissionId,
        approved: bool,
    ) -> Result<Submission, SubmissionError> {
        let status = if approved {
            SubmissionStatus::Approved
        } else {
            SubmissionStatus::Declined
        };
        self.transition(id, status, StatusExtra::default()).await
    }

    async fn transition(
        &self,
        id: &SubmissionId,
        next: SubmissionStatus,
        extra: StatusExtra,
    ) -> Result<Submission, SubmissionError> {
        let current = self.store.get_submission(id).await?;
        if !current.status.can_transition_to(next) {
            warn!(id = %id, from = %current.status, to = %next, "rejected submission transition");
            return Err(SubmissionError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }
        self.store.update_submission_status(id, next, extra).await
    }
}
