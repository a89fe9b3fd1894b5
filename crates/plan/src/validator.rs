use serde::Serialize;
use tracing::debug;

use crate::errors::PlanError;
use crate::types::{Plan, Step, StepKind, ValidatedPlan};

/// Outcome of a structural check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Structural checks run before any step touches the page.
///
/// In strict mode a `wait` step's `value` must be an integer and
/// alternatives must not be blank; the engine otherwise falls back to
/// defaults and skips empty alternatives.
#[derive(Debug, Clone, Default)]
pub struct PlanValidator {
    strict: bool,
}

impl PlanValidator {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn validate(&self, plan: &Plan) -> ValidationReport {
        let mut errors = Vec::new();

        if plan.steps.is_empty() {
            errors.push("Plan must contain at least one step".to_string());
        }

        for (index, step) in plan.steps.iter().enumerate() {
            self.check_step(index, step, &mut errors);
        }

        debug!(
            steps = plan.steps.len(),
            errors = errors.len(),
            "plan validated"
        );
        ValidationReport::from_errors(errors)
    }

    /// Validate and wrap the plan for execution.
    pub fn validate_into(&self, plan: Plan) -> Result<ValidatedPlan, PlanError> {
        let report = self.validate(&plan);
        if report.valid {
            Ok(ValidatedPlan::new(plan))
        } else {
            Err(PlanError::Validation(report.errors))
        }
    }

    fn check_step(&self, index: usize, step: &Step, errors: &mut Vec<String>) {
        let Some(kind) = StepKind::parse(step.kind.trim()) else {
            errors.push(format!(
                "Step {index}: invalid step type '{}'",
                step.kind
            ));
            return;
        };

        if kind.requires_target() && step.target_str().is_none() {
            errors.push(format!(
                "Step {index}: {} step requires a target",
                kind.as_str()
            ));
        }

        if kind.requires_value() && step.value_str().is_none() {
            let what = if kind == StepKind::Navigate {
                "a URL value"
            } else {
                "a value"
            };
            errors.push(format!(
                "Step {index}: {} step requires {what}",
                kind.as_str()
            ));
        }

        if !(0.0..=1.0).contains(&step.confidence) {
            errors.push(format!(
                "Step {index}: confidence {} must be between 0 and 1",
                step.confidence
            ));
        }

        if self.strict {
            if kind == StepKind::Wait {
                if let Some(value) = step.value_str() {
                    if value.parse::<u64>().is_err() {
                        errors.push(format!(
                            "Step {index}: wait value '{value}' is not a whole number of milliseconds"
                        ));
                    }
                }
            }
            if step.alternatives.iter().any(|alt| alt.trim().is_empty()) {
                errors.push(format!("Step {index}: alternatives must not be blank"));
            }
        }
    }
}

/// Validate with default rules and wrap the plan for execution.
pub fn validate_plan(plan: Plan) -> Result<ValidatedPlan, PlanError> {
    PlanValidator::default().validate_into(plan)
}
