use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use autofill_plan::PlanValidator;
use clap::Args;
use tracing::info;

use super::output::{print_structured, OutputFormat};
use super::runtime::read_plan;

/// Exit status when the plan was read but is not valid.
pub const INVALID_PLAN_EXIT: u8 = 2;

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Plan file (JSON)
    pub plan: PathBuf,

    /// Also require integer wait values and non-blank alternatives
    #[arg(long)]
    pub strict: bool,
}

pub async fn cmd_validate(args: ValidateArgs, format: OutputFormat) -> Result<ExitCode> {
    let plan = read_plan(&args.plan).await?;
    let report = PlanValidator::new(args.strict).validate(&plan);
    info!(
        plan = %args.plan.display(),
        steps = plan.steps.len(),
        valid = report.valid,
        "Plan checked"
    );

    match format {
        OutputFormat::Human => {
            if report.valid {
                println!("Plan is valid ({} steps)", plan.steps.len());
                for warning in &plan.warnings {
                    println!("  warning: {warning}");
                }
            } else {
                println!("Plan is invalid:");
                for error in &report.errors {
                    println!("  - {error}");
                }
            }
        }
        other => print_structured(&report, other)?,
    }

    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(INVALID_PLAN_EXIT)
    })
}
