use autofill_plan::{
    validate_plan, Plan, PlanError, PlanValidator, Step, StepAction, WaitFor,
};

fn scenario_a() -> Plan {
    Plan::new(vec![
        Step::type_text("#name", "Sarah")
            .with_description("Enter applicant name")
            .with_confidence(0.95),
        Step::sleep(1000).with_description("Let the page settle"),
        Step::click("#next")
            .with_description("Continue")
            .with_confidence(0.9),
    ])
}

#[test]
fn valid_plan_has_no_errors() {
    let report = PlanValidator::default().validate(&scenario_a());
    assert!(report.valid);
    assert!(report.errors.is_empty());
}

#[test]
fn unknown_step_type_names_index() {
    let mut plan = scenario_a();
    plan.steps.insert(1, Step::new("hover").with_target("#menu"));

    let report = PlanValidator::default().validate(&plan);
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Step 1:"));
    assert!(report.errors[0].contains("hover"));
}

#[test]
fn empty_plan_is_invalid() {
    let report = PlanValidator::default().validate(&Plan::new(Vec::new()));
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
}

#[test]
fn reports_every_violation() {
    let plan = Plan::new(vec![
        Step::new("type").with_target("#email"),
        Step::new("select"),
        Step::new("navigate"),
        Step::click("#go").with_confidence(1.4),
    ]);

    let report = PlanValidator::default().validate(&plan);
    assert!(!report.valid);
    assert_eq!(
        report.errors,
        vec![
            "Step 0: type step requires a value",
            "Step 1: select step requires a target",
            "Step 1: select step requires a value",
            "Step 2: navigate step requires a URL value",
            "Step 3: confidence 1.4 must be between 0 and 1",
        ]
    );
}

#[test]
fn wait_forms_are_both_accepted() {
    let plan = Plan::new(vec![Step::wait_for("#loaded"), Step::new("wait")]);
    let validated = validate_plan(plan).unwrap();

    assert_eq!(
        validated.steps()[0].action,
        StepAction::Wait(WaitFor::Element {
            target: "#loaded".to_string(),
            timeout_ms: None
        })
    );
    assert_eq!(
        validated.steps()[1].action,
        StepAction::Wait(WaitFor::Duration { ms: None })
    );
}

#[test]
fn validation_does_not_touch_input() {
    let plan = scenario_a().with_warning("co-applicant section skipped");
    let before = plan.clone();
    let _ = PlanValidator::strict().validate(&plan);
    assert_eq!(plan, before);
}

#[test]
fn validate_plan_wraps_errors() {
    let err = validate_plan(Plan::new(vec![Step::new("scroll")])).unwrap_err();
    match &err {
        PlanError::Validation(errors) => assert_eq!(errors.len(), 1),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().starts_with("Plan validation failed:"));
}

#[test]
fn validated_plan_keeps_metadata() {
    let plan = Plan::from_json(
        r##"{
            "steps": [
                {"type": "navigate", "value": "https://lender.example/apply", "description": "Open form", "confidence": 1},
                {"type": "pause_for_input", "description": "Solve CAPTCHA", "confidence": 1}
            ],
            "warnings": ["captcha on submit"],
            "captchaLikely": true
        }"##,
    )
    .unwrap();

    let validated = validate_plan(plan).unwrap();
    assert_eq!(validated.len(), 2);
    assert!(validated.captcha_likely());
    assert_eq!(validated.warnings(), ["captcha on submit".to_string()]);
    assert!(validated.steps()[1].is_pause_for_input());
}
