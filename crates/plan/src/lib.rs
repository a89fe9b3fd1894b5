//! Autofill plans and their validator.
//!
//! A [`Plan`] arrives as JSON from the plan generator. [`PlanValidator`]
//! checks it structurally and, on success, produces a [`ValidatedPlan`]
//! whose steps are typed [`StepAction`]s.

pub mod errors;
pub mod types;
pub mod validator;

pub use errors::PlanError;
pub use types::{Plan, PlannedStep, Step, StepAction, StepKind, ValidatedPlan, WaitFor};
pub use validator::{validate_plan, PlanValidator, ValidationReport};
