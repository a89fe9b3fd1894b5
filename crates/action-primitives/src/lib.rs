//! Step interpreter for autofill plans
//!
//! This crate turns a validated plan step into page effects:
//! - 5 page primitives: navigate, type, click, select, wait
//! - `pause_for_input` surfaced as an intervention request
//! - Cancellable built-in waits for loads, settles and element polling
//! - Targets resolved through the action locator

pub mod errors;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
