//! Submission lifecycle for autofill runs.
//!
//! A submission starts `pending`, becomes `submitted` when a run completes,
//! and may later be `approved` or `declined` by review. Failed or cancelled
//! runs move it to `error`. The [`SubmissionStore`] trait is the persistence
//! seam; [`InMemorySubmissionStore`] backs the CLI and tests.

pub mod errors;
pub mod lifecycle;
pub mod store;
pub mod types;

pub use errors::SubmissionError;
pub use lifecycle::SubmissionLifecycle;
pub use store::{InMemorySubmissionStore, SubmissionStore};
pub use types::{
    NewSubmission, RunOutcome, StatusExtra, Submission, SubmissionFilter, SubmissionStatus,
};
