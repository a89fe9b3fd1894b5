use std::fmt;

use autofill_core_types::{DealerId, SubmissionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Submitted,
    Approved,
    Declined,
    Error,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Declined => "declined",
            SubmissionStatus::Error => "error",
        }
    }

    /// `pending -> submitted -> {approved, declined}`; anything may error.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (Pending, Submitted) | (Submitted, Approved) | (Submitted, Declined) | (_, Error)
        )
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One autofill attempt against a lender, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub dealer_id: DealerId,
    pub lender_name: String,
    pub status: SubmissionStatus,
    pub user_interventions: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub dealer_id: DealerId,
    pub lender_name: String,
}

impl NewSubmission {
    pub fn new(dealer_id: DealerId, lender_name: impl Into<String>) -> Self {
        Self {
            dealer_id,
            lender_name: lender_name.into(),
        }
    }
}

/// Fields written alongside a status change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusExtra {
    pub error_message: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl StatusExtra {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn submitted_now() -> Self {
        Self {
            submitted_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// Query for a dealer's submissions, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub dealer_id: DealerId,
    pub status: Option<SubmissionStatus>,
    pub limit: Option<usize>,
}

impl SubmissionFilter {
    pub fn dealer(dealer_id: DealerId) -> Self {
        Self {
            dealer_id,
            status: None,
            limit: None,
        }
    }

    pub fn with_status(mut self, status: SubmissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        submission.dealer_id == self.dealer_id
            && self.status.map_or(true, |status| submission.status == status)
    }
}

/// How an execution run ended, as far as the submission cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { interventions: u32 },
    Failed { error: String, interventions: u32 },
    Cancelled { message: String, interventions: u32 },
}

impl RunOutcome {
    pub fn interventions(&self) -> u32 {
        match self {
            RunOutcome::Completed { interventions }
            | RunOutcome::Failed { interventions, .. }
            | RunOutcome::Cancelled { interventions, .. } => *interventions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_graph() {
        use SubmissionStatus::*;
        assert!(Pending.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(Approved));
        assert!(Submitted.can_transition_to(Declined));
        assert!(Approved.can_transition_to(Error));
        assert!(!Pending.can_transition_to(Approved));
        assert!(!Declined.can_transition_to(Submitted));
        assert!(!Error.can_transition_to(Submitted));
    }

    #[test]
    fn wire_form_is_camel_case() {
        let now = Utc::now();
        let submission = Submission {
            id: SubmissionId("sub-1".into()),
            dealer_id: DealerId::new("dealer-9"),
            lender_name: "Acme Credit".into(),
            status: SubmissionStatus::Pending,
            user_interventions: 0,
            error_message: None,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["lenderName"], "Acme Credit");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["userInterventions"], 0);
        assert!(json.get("errorMessage").is_none());
    }
}
