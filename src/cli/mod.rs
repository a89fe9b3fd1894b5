pub mod app;
pub mod env;
pub mod output;
pub mod run;
pub mod runtime;
pub mod validate;

pub use app::run;
pub use output::OutputFormat;
pub use run::{cmd_run, RunArgs};
pub use validate::{cmd_validate, ValidateArgs, INVALID_PLAN_EXIT};
