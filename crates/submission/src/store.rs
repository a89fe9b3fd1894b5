use std::cmp::Reverse;

use async_trait::async_trait;
use autofill_core_types::SubmissionId;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use crate::errors::SubmissionError;
use crate::types::{NewSubmission, StatusExtra, Submission, SubmissionFilter, SubmissionStatus};

/// Persistence sink for submissions.
///
/// Stores record what they are told; transition rules live in
/// [`crate::SubmissionLifecycle`].
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create_submission(&self, new: NewSubmission) -> Result<Submission, SubmissionError>;

    async fn update_submission_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        extra: StatusExtra,
    ) -> Result<Submission, SubmissionError>;

    async fn increment_user_interventions(
        &self,
        id: &SubmissionId,
    ) -> Result<Submission, SubmissionError>;

    async fn get_submissions_by_dealer(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<Submission>, SubmissionError>;

    async fn get_submission(&self, id: &SubmissionId) -> Result<Submission, SubmissionError>;
}

/// Store kept in process memory.
#[derive(Default)]
pub struct InMemorySubmissionStore {
    submissions: DashMap<SubmissionId, Submission>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    fn modify<F>(&self, id: &SubmissionId, f: F) -> Result<Submission, SubmissionError>
    where
        F: FnOnce(&mut Submission),
    {
        let mut entry = self
            .submissions
            .get_mut(id)
            .ok_or_else(|| SubmissionError::NotFound(id.to_string()))?;
        f(entry.value_mut());
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn create_submission(&self, new: NewSubmission) -> Result<Submission, SubmissionError> {
        let now = Utc::now();
        let submission = Submission {
            id: SubmissionId::new(),
            dealer_id: new.dealer_id,
            lender_name: new.lender_name,
            status: SubmissionStatus::Pending,
            user_interventions: 0,
            error_message: None,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        };
        debug!(id = %submission.id, lender = %submission.lender_name, "submission created");
        self.submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    async fn update_submission_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        extra: StatusExtra,
    ) -> Result<Submission, SubmissionError> {
        self.modify(id, |submission| {
            submission.status = status;
            if extra.error_message.is_some() {
                submission.error_message = extra.error_message;
            }
            if extra.submitted_at.is_some() {
                submission.submitted_at = extra.submitted_at;
            }
        })
    }

    async fn increment_user_interventions(
        &self,
        id: &SubmissionId,
    ) -> Result<Submission, SubmissionError> {
        self.modify(id, |submission| submission.user_interventions += 1)
    }

    async fn get_submissions_by_dealer(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<Submission>, SubmissionError> {
        let mut found: Vec<Submission> = self
            .submissions
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|submission| Reverse(submission.created_at));
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn get_submission(&self, id: &SubmissionId) -> Result<Submission, SubmissionError> {
        self.submissions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SubmissionError::NotFound(id.to_string()))
    }
}
