//! Intervention gate - hands a step to a human
//!
//! Used for `pause_for_input` steps and for low-confidence steps that
//! failed. The gate:
//! - Pauses the run through the [`Suspendable`] seam
//! - Emits `requiresUserIntervention` and posts a persistent notice
//! - Waits for resume, cancellation, or an optional ceiling

pub mod errors;
pub mod gate;
pub mod types;

pub use errors::*;
pub use gate::*;
pub use types::*;
