use std::sync::Arc;
use std::time::Duration;

use action_flow::{EngineConfig, ExecutionController, FlowError, RunState};
use autofill_core_types::{DealerId, EngineEvent, NoticeSeverity};
use autofill_event_bus::{EventBus, InMemoryBus, InMemoryNoticeBoard};
use autofill_plan::{Plan, Step};
use autofill_submission::{InMemorySubmissionStore, SubmissionLifecycle, SubmissionStatus};
use page_adapter::{FixtureElement, FixturePage};
use tokio::sync::broadcast;

struct Harness {
    controller: ExecutionController,
    bus: Arc<InMemoryBus<EngineEvent>>,
    notices: Arc<InMemoryNoticeBoard>,
    page: Arc<FixturePage>,
    lifecycle: SubmissionLifecycle,
}

fn lender_page() -> FixturePage {
    FixturePage::new("https://lender.example/apply")
        .with_element(FixtureElement::new("name").selector("#name"))
        .with_element(
            FixtureElement::new("submit")
                .selector("#submit")
                .path("//button[@type='submit']"),
        )
}

fn harness_with(page: FixturePage, config: EngineConfig) -> Harness {
    let page = Arc::new(page);
    let bus = InMemoryBus::<EngineEvent>::new(64);
    let notices = Arc::new(InMemoryNoticeBoard::new());
    let lifecycle = SubmissionLifecycle::new(Arc::new(InMemorySubmissionStore::new()));
    let controller =
        ExecutionController::for_page(page.clone(), bus.clone(), notices.clone(), config)
            .with_submissions(lifecycle.clone());
    Harness {
        controller,
        bus,
        notices,
        page,
        lifecycle,
    }
}

fn harness() -> Harness {
    harness_with(lender_page(), EngineConfig::default())
}

fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn next_intervention(rx: &mut broadcast::Receiver<EngineEvent>) -> String {
    loop {
        match rx.recv().await.unwrap() {
            EngineEvent::RequiresUserIntervention { message } => return message,
            EngineEvent::AutofillComplete { success, message } => {
                panic!("run ended before intervention: success={success} message={message}")
            }
            _ => {}
        }
    }
}

fn progress_values(events: &[EngineEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::UpdateProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

fn completions(events: &[EngineEvent]) -> Vec<(bool, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::AutofillComplete { success, message } => Some((*success, message.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn cooperative_page_completes_and_submits() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let submission = h
        .controller
        .open_submission(DealerId::new("dealer-1"), "Acme Credit")
        .await
        .unwrap();

    let plan = Plan::new(vec![
        Step::type_text("#name", "Sarah").with_confidence(0.95),
        Step::click("#submit").with_confidence(0.95),
        Step::sleep(1000),
    ]);
    let report = h
        .controller
        .start_for_submission(plan, submission.id.clone())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    let events = drain(&mut rx);
    assert_eq!(progress_values(&events), vec![33, 67, 100]);
    assert_eq!(
        events.last(),
        Some(&EngineEvent::complete(true, "Autofill completed successfully"))
    );
    assert_eq!(completions(&events).len(), 1);

    assert_eq!(h.page.value_of("name").as_deref(), Some("Sarah"));
    assert_eq!(h.page.activations("submit"), 1);

    let stored = h.lifecycle.store().get_submission(&submission.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
    assert!(stored.submitted_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn completed_run_visits_steps_in_order() {
    let h = harness();
    let plan = Plan::new(vec![
        Step::sleep(10),
        Step::type_text("#name", "Sarah"),
        Step::wait_for("#submit"),
        Step::click("#submit"),
    ]);

    let report = h.controller.start(plan).unwrap().wait().await.unwrap();

    assert!(report.succeeded());
    let indices: Vec<usize> = report.steps.iter().map(|record| record.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(report.steps_executed, 4);
    assert_eq!(h.controller.snapshot().unwrap().step_index, Some(3));
}

#[tokio::test(start_paused = true)]
async fn pause_for_input_waits_for_resume() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let submission = h
        .controller
        .open_submission(DealerId::new("dealer-1"), "Acme Credit")
        .await
        .unwrap();

    let handle = h
        .controller
        .start_for_submission(
            Plan::new(vec![Step::pause_for_input("Verify identity")]),
            submission.id.clone(),
        )
        .unwrap();

    assert_eq!(next_intervention(&mut rx).await, "Verify identity");
    assert_eq!(h.controller.state(), RunState::Paused);
    assert_eq!(h.notices.shown().len(), 1);
    assert!(h.notices.shown()[0].is_persistent());

    // Paused stays paused while time passes.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.controller.state(), RunState::Paused);

    h.controller.resume().unwrap();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.intervention_count, 1);
    assert_eq!(report.interventions.len(), 1);
    assert!(h.notices.shown().is_empty());

    let stored = h.lifecycle.store().get_submission(&submission.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
    assert_eq!(stored.user_interventions, 1);
}

#[tokio::test(start_paused = true)]
async fn unresolvable_target_fails_run() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let submission = h
        .controller
        .open_submission(DealerId::new("dealer-1"), "Acme Credit")
        .await
        .unwrap();

    let plan = Plan::new(vec![Step::click("#ghost").with_confidence(0.95)]);
    let report = h
        .controller
        .start_for_submission(plan, submission.id.clone())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Failed);
    let message = report.last_error.clone().unwrap();
    assert!(message.starts_with("Failed to execute step: "), "{message}");
    assert!(message.contains("#ghost"));

    let events = drain(&mut rx);
    assert_eq!(completions(&events), vec![(false, message.clone())]);
    assert!(!events
        .iter()
        .any(|event| matches!(event, EngineEvent::RequiresUserIntervention { .. })));

    let error_notice = h
        .notices
        .history()
        .into_iter()
        .find(|notice| notice.severity == NoticeSeverity::Error)
        .unwrap();
    assert_eq!(error_notice.auto_dismiss_ms, 8000);

    let stored = h.lifecycle.store().get_submission(&submission.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Error);
    assert_eq!(stored.error_message.as_deref(), Some(message.as_str()));
}

#[tokio::test(start_paused = true)]
async fn low_confidence_failure_goes_to_gate() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let plan = Plan::new(vec![Step::click("#ghost")
        .with_description("Accept terms")
        .with_confidence(0.5)]);

    let handle = h.controller.start(plan).unwrap();
    let message = next_intervention(&mut rx).await;
    assert!(message.contains("Accept terms"), "{message}");
    assert_eq!(h.controller.state(), RunState::Paused);

    h.controller.resume().unwrap();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.intervention_count, 1);
    assert!(report.steps[0].intervention.is_some());
}

#[tokio::test(start_paused = true)]
async fn low_confidence_gate_precedes_alternatives() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let plan = Plan::new(vec![Step::click("#ghost")
        .with_confidence(0.4)
        .with_alternatives(["#submit"])]);

    let handle = h.controller.start(plan).unwrap();
    next_intervention(&mut rx).await;
    assert_eq!(h.page.activations("submit"), 0);

    h.controller.resume().unwrap();
    handle.wait().await.unwrap();
    assert_eq!(h.page.activations("submit"), 0);
}

#[tokio::test(start_paused = true)]
async fn alternative_target_recovers_without_gate() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let plan = Plan::new(vec![Step::click("#submit-button")
        .with_confidence(0.9)
        .with_alternatives(["#still-missing", "//button[@type='submit']"])]);

    let report = h.controller.start(plan).unwrap().wait().await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.intervention_count, 0);
    let step = &report.steps[0];
    assert!(step.success);
    assert_eq!(step.attempts, 3);
    assert_eq!(step.used_target.as_deref(), Some("//button[@type='submit']"));
    assert_eq!(h.page.activations("submit"), 1);

    let events = drain(&mut rx);
    assert!(!events
        .iter()
        .any(|event| matches!(event, EngineEvent::RequiresUserIntervention { .. })));
}

#[tokio::test(start_paused = true)]
async fn cancel_while_paused_stops_everything() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let submission = h
        .controller
        .open_submission(DealerId::new("dealer-1"), "Acme Credit")
        .await
        .unwrap();
    let plan = Plan::new(vec![
        Step::pause_for_input("Solve the captcha"),
        Step::type_text("#name", "Sarah"),
        Step::click("#submit"),
    ]);

    let handle = h
        .controller
        .start_for_submission(plan, submission.id.clone())
        .unwrap();
    next_intervention(&mut rx).await;

    h.controller.cancel().unwrap();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.state, RunState::Cancelled);
    assert_eq!(report.intervention_count, 0);
    let after_cancel = drain(&mut rx);
    assert!(progress_values(&after_cancel).is_empty());
    assert_eq!(
        completions(&after_cancel),
        vec![(false, "Autofill cancelled".to_string())]
    );
    assert_eq!(h.page.value_of("name").as_deref(), Some(""));
    assert!(h.notices.shown().is_empty());

    let stored = h.lifecycle.store().get_submission(&submission.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_resolver_rounds_stops_the_run() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let submission = h
        .controller
        .open_submission(DealerId::new("dealer-1"), "Acme Credit")
        .await
        .unwrap();
    let plan = Plan::new(vec![
        Step::click("#ghost").with_confidence(0.95),
        Step::type_text("#name", "Sarah"),
    ]);

    let handle = h
        .controller
        .start_for_submission(plan, submission.id.clone())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(h.controller.state(), RunState::Running);

    h.controller.cancel().unwrap();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.state, RunState::Cancelled);
    let events = drain(&mut rx);
    assert_eq!(progress_values(&events), vec![50]);
    assert_eq!(
        completions(&events),
        vec![(false, "Autofill cancelled".to_string())]
    );
    assert_eq!(h.page.value_of("name").as_deref(), Some(""));

    let stored = h.lifecycle.store().get_submission(&submission.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Error);
    assert_eq!(stored.error_message.as_deref(), Some("Autofill cancelled"));
}

#[tokio::test(start_paused = true)]
async fn cancel_during_settle_delay_skips_remaining_steps() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let handle = h
        .controller
        .start(Plan::new(vec![
            Step::sleep(10),
            Step::type_text("#name", "Sarah"),
        ]))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    h.controller.cancel().unwrap();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.state, RunState::Cancelled);
    assert_eq!(report.steps.len(), 1);
    let events = drain(&mut rx);
    assert_eq!(progress_values(&events), vec![50]);
    assert_eq!(completions(&events).len(), 1);
    assert_eq!(h.page.value_of("name").as_deref(), Some(""));
}

#[tokio::test(start_paused = true)]
async fn pause_after_last_step_holds_completion() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let handle = h
        .controller
        .start(Plan::new(vec![Step::sleep(10)]))
        .unwrap();

    // Inside the settle delay that follows the only step.
    tokio::time::sleep(Duration::from_millis(200)).await;
    h.controller.pause().unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(h.controller.state(), RunState::Paused);
    assert!(completions(&drain(&mut rx)).is_empty());

    h.controller.resume().unwrap();
    let report = handle.wait().await.unwrap();
    assert_eq!(report.state, RunState::Completed);
    assert_eq!(
        completions(&drain(&mut rx)),
        vec![(true, "Autofill completed successfully".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn resume_while_running_changes_nothing() {
    let h = harness();
    let handle = h
        .controller
        .start(Plan::new(vec![Step::sleep(1000)]))
        .unwrap();

    let before = handle.snapshot();
    assert_eq!(before.state, RunState::Running);
    h.controller.resume().unwrap();
    assert_eq!(handle.snapshot(), before);

    let report = handle.wait().await.unwrap();
    assert_eq!(report.intervention_count, 0);
}

#[tokio::test(start_paused = true)]
async fn user_pause_holds_the_next_step() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    let handle = h
        .controller
        .start(Plan::new(vec![Step::type_text("#name", "Sarah")]))
        .unwrap();
    h.controller.pause().unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.controller.state(), RunState::Paused);
    assert!(drain(&mut rx).is_empty());
    assert_eq!(h.page.value_of("name").as_deref(), Some(""));

    h.controller.resume().unwrap();
    let report = handle.wait().await.unwrap();
    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.intervention_count, 0);
    assert_eq!(h.page.value_of("name").as_deref(), Some("Sarah"));
}

#[tokio::test(start_paused = true)]
async fn second_start_is_rejected_while_active() {
    let h = harness();
    let handle = h
        .controller
        .start(Plan::new(vec![Step::sleep(1000)]))
        .unwrap();

    let err = h
        .controller
        .start(Plan::new(vec![Step::sleep(10)]))
        .err()
        .unwrap();
    assert_eq!(err, FlowError::RunActive(RunState::Running));

    handle.wait().await.unwrap();
    let again = h
        .controller
        .start(Plan::new(vec![Step::sleep(10)]))
        .unwrap();
    assert_eq!(again.wait().await.unwrap().state, RunState::Completed);
}

#[tokio::test(start_paused = true)]
async fn invalid_plan_never_starts() {
    let h = harness();
    let mut rx = h.bus.subscribe();

    let err = h
        .controller
        .start(Plan::new(vec![Step::new("hover").with_target("#name")]))
        .err()
        .unwrap();

    match err {
        FlowError::Validation(message) => assert!(message.contains("Step 0"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.controller.state(), RunState::Idle);
    assert!(h.controller.snapshot().is_none());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn control_requests_without_run_are_invalid() {
    let h = harness();
    assert_eq!(
        h.controller.pause(),
        Err(FlowError::InvalidTransition {
            from: RunState::Idle,
            request: "pause"
        })
    );
    assert!(h.controller.resume().is_err());
    assert!(h.controller.cancel().is_err());
}

#[tokio::test(start_paused = true)]
async fn unanswered_intervention_expires_when_capped() {
    let config = EngineConfig {
        intervention_timeout_ms: Some(2_000),
        ..EngineConfig::default()
    };
    let h = harness_with(lender_page(), config);

    let report = h
        .controller
        .start(Plan::new(vec![Step::pause_for_input("Verify identity")]))
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert!(report
        .last_error
        .as_deref()
        .unwrap()
        .contains("Intervention not resolved within"));
    assert_eq!(report.intervention_count, 0);
    assert!(h.notices.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn navigation_ceiling_fails_stalled_load() {
    let config = EngineConfig {
        navigation_timeout_ms: Some(3_000),
        ..EngineConfig::default()
    };
    let h = harness_with(lender_page().stalling_navigation(), config);

    let report = h
        .controller
        .start(Plan::new(vec![Step::navigate("https://lender.example/step-2")]))
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(h.page.url(), "https://lender.example/step-2");
}
