use std::sync::Arc;

use autofill_core_types::DealerId;
use autofill_submission::{
    InMemorySubmissionStore, RunOutcome, SubmissionError, SubmissionLifecycle, SubmissionStatus,
};

fn lifecycle() -> SubmissionLifecycle {
    SubmissionLifecycle::new(Arc::new(InMemorySubmissionStore::new()))
}

#[tokio::test]
async fn completed_run_submits() {
    let lifecycle = lifecycle();
    let submission = lifecycle
        .open(DealerId::new("dealer-7"), "Acme Credit")
        .await
        .unwrap();
    assert_eq!(submission.status, SubmissionStatus::Pending);

    let updated = lifecycle
        .apply_outcome(&submission.id, &RunOutcome::Completed { interventions: 2 })
        .await
        .unwrap();

    assert_eq!(updated.status, SubmissionStatus::Submitted);
    assert!(updated.submitted_at.is_some());
    assert_eq!(updated.user_interventions, 2);
}

#[tokio::test]
async fn failed_run_carries_error() {
    let lifecycle = lifecycle();
    let submission = lifecycle
        .open(DealerId::new("dealer-7"), "Acme Credit")
        .await
        .unwrap();

    let updated = lifecycle
        .apply_outcome(
            &submission.id,
            &RunOutcome::Failed {
                error: "Failed to execute step: Element not found: #ssn".into(),
                interventions: 0,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, SubmissionStatus::Error);
    assert_eq!(
        updated.error_message.as_deref(),
        Some("Failed to execute step: Element not found: #ssn")
    );
    assert!(updated.submitted_at.is_none());
}

#[tokio::test]
async fn review_only_from_submitted() {
    let lifecycle = lifecycle();
    let submission = lifecycle
        .open(DealerId::new("dealer-7"), "Acme Credit")
        .await
        .unwrap();

    let err = lifecycle.review(&submission.id, true).await.unwrap_err();
    assert_eq!(
        err,
        SubmissionError::InvalidTransition {
            from: SubmissionStatus::Pending,
            to: SubmissionStatus::Approved
        }
    );

    lifecycle
        .apply_outcome(&submission.id, &RunOutcome::Completed { interventions: 0 })
        .await
        .unwrap();
    let declined = lifecycle.review(&submission.id, false).await.unwrap();
    assert_eq!(declined.status, SubmissionStatus::Declined);
}

#[tokio::test]
async fn second_completion_is_rejected() {
    let lifecycle = lifecycle();
    let submission = lifecycle
        .open(DealerId::new("dealer-7"), "Acme Credit")
        .await
        .unwrap();
    lifecycle
        .apply_outcome(&submission.id, &RunOutcome::Completed { interventions: 0 })
        .await
        .unwrap();

    let err = tokio_test::assert_err!(
        lifecycle
            .apply_outcome(&submission.id, &RunOutcome::Completed { interventions: 0 })
            .await
    );
    assert!(matches!(err, SubmissionError::InvalidTransition { .. }));
}

#[tokio::test]
async fn interventions_never_decrease() {
    let lifecycle = lifecycle();
    let submission = lifecycle
        .open(DealerId::new("dealer-7"), "Acme Credit")
        .await
        .unwrap();

    for _ in 0..3 {
        tokio_test::assert_ok!(lifecycle.record_intervention(&submission.id).await);
    }

    let synced = lifecycle.sync_interventions(&submission.id, 1).await.unwrap();
    assert_eq!(synced.user_interventions, 3);

    let updated = lifecycle
        .apply_outcome(
            &submission.id,
            &RunOutcome::Cancelled {
                message: "Autofill cancelled".into(),
                interventions: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.user_interventions, 3);
    assert_eq!(updated.status, SubmissionStatus::Error);
}
