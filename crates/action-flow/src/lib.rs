//! Execution controller for autofill plans
//!
//! Drives a validated plan step by step against one page context:
//! pause, resume and cancel from the host, recovery through alternative
//! targets, hand-off to a human through the intervention gate, and exactly
//! one terminal event per run mirrored into the submission lifecycle.

pub mod config;
pub mod controller;
pub mod errors;
pub mod policy;
pub mod run;
pub mod types;

pub use config::EngineConfig;
pub use controller::{progress_percent, ExecutionController, RunHandle};
pub use errors::FlowError;
pub use policy::StepPolicy;
pub use run::{ExecutionRun, PauseOrigin, RunSnapshot, RunState};
pub use types::{RunReport, StepRecord};
