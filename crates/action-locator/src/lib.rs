//! Target resolution for plan steps
//!
//! A step target is a selector string written by the plan generator. It is
//! resolved against the live page by trying strategies in a fixed order:
//! - Structural selector query (primary)
//! - Path query expression, only when the structural engine rejects the
//!   target as malformed
//!
//! Unmatched targets are retried for a bounded number of rounds so elements
//! rendered late still resolve.

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
