//! Plan model
//!
//! [`Plan`] and [`Step`] are the wire shapes produced by the plan generator.
//! They stay loosely typed so the validator can report malformed input.
//! After validation each step becomes a [`PlannedStep`] whose [`StepAction`]
//! carries exactly the fields its kind needs.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::PlanError;

/// Ordered automation for one lender page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub steps: Vec<Step>,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub captcha_likely: bool,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            warnings: Vec::new(),
            captcha_likely: false,
        }
    }

    pub fn from_json(source: &str) -> Result<Self, PlanError> {
        serde_json::from_str(source).map_err(|err| PlanError::Parse(err.to_string()))
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_captcha_likely(mut self, likely: bool) -> Self {
        self.captcha_likely = likely;
        self
    }
}

/// One step as emitted by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Raw step kind; see [`StepKind`] for the recognized values.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Generator confidence; absent means fully confident.
    #[serde(default = "full_confidence")]
    pub confidence: f64,

    #[serde(default)]
    pub alternatives: Vec<String>,
}

fn full_confidence() -> f64 {
    1.0
}

/// Generators emit wait durations both as `"1000"` and `1000`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Step {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: None,
            value: None,
            description: String::new(),
            confidence: 1.0,
            alternatives: Vec::new(),
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(StepKind::Navigate.as_str()).with_value(url)
    }

    pub fn type_text(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(StepKind::Type.as_str())
            .with_target(target)
            .with_value(value)
    }

    pub fn click(target: impl Into<String>) -> Self {
        Self::new(StepKind::Click.as_str()).with_target(target)
    }

    pub fn select(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(StepKind::Select.as_str())
            .with_target(target)
            .with_value(value)
    }

    /// Wait for an element to exist.
    pub fn wait_for(target: impl Into<String>) -> Self {
        Self::new(StepKind::Wait.as_str()).with_target(target)
    }

    /// Wait a fixed number of milliseconds.
    pub fn sleep(ms: u64) -> Self {
        Self::new(StepKind::Wait.as_str()).with_value(ms.to_string())
    }

    pub fn pause_for_input(description: impl Into<String>) -> Self {
        Self::new(StepKind::PauseForInput.as_str()).with_description(description)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }

    /// Target with surrounding whitespace removed; `None` when blank.
    pub fn target_str(&self) -> Option<&str> {
        non_blank(self.target.as_deref())
    }

    /// Value with surrounding whitespace removed; `None` when blank.
    pub fn value_str(&self) -> Option<&str> {
        non_blank(self.value.as_deref())
    }
}

fn non_blank(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|s| !s.is_empty())
}

/// The six recognized step kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Navigate,
    Type,
    Click,
    Select,
    Wait,
    PauseForInput,
}

impl StepKind {
    pub const ALL: [StepKind; 6] = [
        StepKind::Navigate,
        StepKind::Type,
        StepKind::Click,
        StepKind::Select,
        StepKind::Wait,
        StepKind::PauseForInput,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Navigate => "navigate",
            StepKind::Type => "type",
            StepKind::Click => "click",
            StepKind::Select => "select",
            StepKind::Wait => "wait",
            StepKind::PauseForInput => "pause_for_input",
        }
    }

    pub fn requires_target(&self) -> bool {
        matches!(self, StepKind::Type | StepKind::Click | StepKind::Select)
    }

    pub fn requires_value(&self) -> bool {
        matches!(self, StepKind::Navigate | StepKind::Type | StepKind::Select)
    }
}

/// What a wait step waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitFor {
    /// Poll until the target exists. `None` uses the engine default timeout.
    Element {
        target: String,
        timeout_ms: Option<u64>,
    },
    /// Sleep. `None` uses the engine default duration.
    Duration { ms: Option<u64> },
}

/// Typed effect of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Navigate { url: String },
    Type { target: String, value: String },
    Click { target: String },
    Select { target: String, value: String },
    Wait(WaitFor),
    PauseForInput,
    /// Kind the interpreter does not know; executes as a no-op.
    Unknown { kind: String },
}

impl StepAction {
    pub fn kind_name(&self) -> &str {
        match self {
            StepAction::Navigate { .. } => StepKind::Navigate.as_str(),
            StepAction::Type { .. } => StepKind::Type.as_str(),
            StepAction::Click { .. } => StepKind::Click.as_str(),
            StepAction::Select { .. } => StepKind::Select.as_str(),
            StepAction::Wait(_) => StepKind::Wait.as_str(),
            StepAction::PauseForInput => StepKind::PauseForInput.as_str(),
            StepAction::Unknown { kind } => kind,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            StepAction::Type { target, .. }
            | StepAction::Click { target }
            | StepAction::Select { target, .. }
            | StepAction::Wait(WaitFor::Element { target, .. }) => Some(target),
            _ => None,
        }
    }
}

/// A validated step, ready for the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    pub index: usize,
    pub action: StepAction,
    pub description: String,
    pub confidence: f64,
    pub alternatives: Vec<String>,
}

impl PlannedStep {
    pub fn from_step(index: usize, step: &Step) -> Self {
        let target = step.target_str().map(str::to_string);
        // Values reach the page exactly as written; only waits parse a trimmed copy.
        let raw_value = step.value.clone().unwrap_or_default();
        let value = step.value_str().map(str::to_string);
        let action = match (StepKind::parse(step.kind.trim()), target) {
            (Some(StepKind::Navigate), _) => StepAction::Navigate { url: raw_value },
            (Some(StepKind::Type), Some(target)) => StepAction::Type {
                target,
                value: raw_value,
            },
            (Some(StepKind::Click), Some(target)) => StepAction::Click { target },
            (Some(StepKind::Select), Some(target)) => StepAction::Select {
                target,
                value: raw_value,
            },
            (Some(StepKind::Wait), Some(target)) => StepAction::Wait(WaitFor::Element {
                target,
                timeout_ms: value.and_then(|v| v.parse().ok()),
            }),
            (Some(StepKind::Wait), None) => StepAction::Wait(WaitFor::Duration {
                ms: value.and_then(|v| v.parse().ok()),
            }),
            (Some(StepKind::PauseForInput), _) => StepAction::PauseForInput,
            (Some(kind), None) => StepAction::Unknown {
                kind: format!("{} (missing target)", kind.as_str()),
            },
            (None, _) => StepAction::Unknown {
                kind: step.kind.clone(),
            },
        };

        Self {
            index,
            action,
            description: step.description.clone(),
            confidence: step.confidence,
            alternatives: step.alternatives.clone(),
        }
    }

    pub fn kind_name(&self) -> &str {
        self.action.kind_name()
    }

    pub fn target(&self) -> Option<&str> {
        self.action.target()
    }

    pub fn is_pause_for_input(&self) -> bool {
        matches!(self.action, StepAction::PauseForInput)
    }

    /// Copy of this step aimed at a different target. Steps without a
    /// target are returned unchanged.
    pub fn retargeted(&self, new_target: &str) -> Self {
        let mut step = self.clone();
        match &mut step.action {
            StepAction::Type { target, .. }
            | StepAction::Click { target }
            | StepAction::Select { target, .. }
            | StepAction::Wait(WaitFor::Element { target, .. }) => {
                *target = new_target.to_string();
            }
            _ => {}
        }
        step
    }

    /// Progress text: the description, or a generic label when blank.
    pub fn status_message(&self) -> String {
        let description = self.description.trim();
        if description.is_empty() {
            format!("Executing step {}", self.index + 1)
        } else {
            description.to_string()
        }
    }
}

/// A plan that passed validation. Only the validator can build one.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    plan: Plan,
    steps: Vec<PlannedStep>,
}

impl ValidatedPlan {
    pub(crate) fn new(plan: Plan) -> Self {
        let steps = plan
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| PlannedStep::from_step(index, step))
            .collect();
        Self { plan, steps }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.plan.warnings
    }

    pub fn captcha_likely(&self) -> bool {
        self.plan.captcha_likely
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generator_json() {
        let plan = Plan::from_json(
            r##"{
                "steps": [
                    {"type": "type", "target": "#name", "value": "Sarah", "description": "Enter name", "confidence": 0.95},
                    {"type": "wait", "value": 1000, "description": "Let the page settle", "confidence": 0.9}
                ],
                "warnings": ["co-applicant section skipped"],
                "captchaLikely": true
            }"##,
        )
        .unwrap();

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].value.as_deref(), Some("1000"));
        assert!(plan.captcha_likely);
        assert!(plan.steps[0].alternatives.is_empty());
    }

    #[test]
    fn wait_without_target_becomes_duration() {
        let step = PlannedStep::from_step(0, &Step::sleep(1000));
        assert_eq!(
            step.action,
            StepAction::Wait(WaitFor::Duration { ms: Some(1000) })
        );
    }

    #[test]
    fn wait_with_target_reads_timeout_from_value() {
        let step = PlannedStep::from_step(0, &Step::wait_for("#done").with_value("2500"));
        assert_eq!(
            step.action,
            StepAction::Wait(WaitFor::Element {
                target: "#done".to_string(),
                timeout_ms: Some(2500)
            })
        );
    }

    #[test]
    fn retargeting_keeps_value() {
        let step = PlannedStep::from_step(3, &Step::type_text("#email", "a@b.co"));
        let alt = step.retargeted("input[name='email']");
        assert_eq!(
            alt.action,
            StepAction::Type {
                target: "input[name='email']".to_string(),
                value: "a@b.co".to_string()
            }
        );
        assert_eq!(alt.index, 3);
    }

    #[test]
    fn typed_and_selected_values_are_not_trimmed() {
        let typed = PlannedStep::from_step(0, &Step::type_text("#pw", "  secret "));
        assert_eq!(
            typed.action,
            StepAction::Type {
                target: "#pw".to_string(),
                value: "  secret ".to_string()
            }
        );
        let selected = PlannedStep::from_step(1, &Step::select("#state", "NY "));
        assert!(matches!(selected.action, StepAction::Select { ref value, .. } if value == "NY "));
    }

    #[test]
    fn status_message_falls_back_to_step_number() {
        let step = PlannedStep::from_step(1, &Step::click("#next"));
        assert_eq!(step.status_message(), "Executing step 2");
    }
}
