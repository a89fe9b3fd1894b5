use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use action_flow::{ExecutionController, RunReport};
use anyhow::{Context, Result};
use autofill_core_types::{DealerId, EngineEvent, Notice};
use autofill_event_bus::{EventBus, InMemoryBus, InMemoryNoticeBoard};
use autofill_submission::{InMemorySubmissionStore, Submission, SubmissionLifecycle};
use clap::Args;
use page_adapter::FixturePage;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::output::{print_structured, OutputFormat};
use super::runtime::{read_fixture, read_plan};
use crate::config::Config;

const EVENT_CAPACITY: usize = 256;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Plan file (JSON)
    pub plan: PathBuf,

    /// Fixture page description (YAML)
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// Dealer the submission belongs to
    #[arg(long, default_value = "local-dealer")]
    pub dealer: String,

    /// Lender the form belongs to
    #[arg(long, default_value = "Fixture Lender")]
    pub lender: String,

    /// Also require integer wait values and non-blank alternatives
    #[arg(long)]
    pub strict: bool,

    /// Resume interventions immediately instead of waiting for Enter
    #[arg(long)]
    pub auto_resume: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput<'a> {
    report: &'a RunReport,
    submission: &'a Submission,
    notices: Vec<Notice>,
}

pub async fn cmd_run(args: RunArgs, config: &Config, format: OutputFormat) -> Result<ExitCode> {
    let plan = read_plan(&args.plan).await?;
    let fixture = read_fixture(&args.page).await?;

    let page = Arc::new(FixturePage::from_spec(fixture));
    let events = InMemoryBus::<EngineEvent>::new(EVENT_CAPACITY);
    let notices = Arc::new(InMemoryNoticeBoard::new());
    let lifecycle = SubmissionLifecycle::new(Arc::new(InMemorySubmissionStore::new()));

    let mut controller = ExecutionController::for_page(
        page.clone(),
        events.clone(),
        notices.clone(),
        config.engine.clone(),
    )
    .with_submissions(lifecycle.clone());
    if args.strict {
        controller = controller.with_strict_validation();
    }
    let controller = Arc::new(controller);

    let submission = controller
        .open_submission(DealerId::new(args.dealer.clone()), &args.lender)
        .await
        .context("Failed to open submission")?;

    let rx = events.subscribe();
    let handle = controller
        .start_for_submission(plan, submission.id.clone())
        .context("Failed to start run")?;
    info!(
        run_id = %handle.run_id(),
        submission_id = %submission.id,
        url = %page.url(),
        "Autofill run started"
    );

    let printer = tokio::spawn(print_events(rx, controller.clone(), args.auto_resume));
    spawn_operator_input(controller.clone());
    let interrupt = {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling run");
                if let Err(err) = controller.cancel() {
                    debug!(error = %err, "Cancel ignored");
                }
            }
        })
    };

    let report = handle.wait().await.context("Run did not finish")?;
    interrupt.abort();
    if let Err(err) = printer.await {
        debug!(error = %err, "Event printer stopped early");
    }

    let submission = lifecycle
        .store()
        .get_submission(&submission.id)
        .await
        .context("Failed to read submission")?;

    print_structured(
        &RunOutput {
            report: &report,
            submission: &submission,
            notices: notices.history(),
        },
        format,
    )?;

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Progress goes to stderr; stdout carries the final report.
async fn print_events(
    mut rx: broadcast::Receiver<EngineEvent>,
    controller: Arc<ExecutionController>,
    auto_resume: bool,
) {
    loop {
        match rx.recv().await {
            Ok(EngineEvent::UpdateProgress { progress, status }) => {
                eprintln!("[{progress:>3}%] {status}");
            }
            Ok(EngineEvent::RequiresUserIntervention { message }) => {
                eprintln!("Intervention needed: {message}");
                if auto_resume {
                    if let Err(err) = controller.resume() {
                        warn!(error = %err, "Auto-resume failed");
                    }
                } else {
                    eprintln!("Press Enter to resume, Ctrl-C to cancel");
                }
            }
            Ok(EngineEvent::AutofillComplete { success, message }) => {
                let label = if success { "done" } else { "stopped" };
                eprintln!("Autofill {label}: {message}");
                break;
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Each line on stdin resumes the run. Reading stdin blocks, so it lives on
/// a plain thread that dies with the process.
fn spawn_operator_input(controller: Arc<ExecutionController>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() {
                break;
            }
            if let Err(err) = controller.resume() {
                debug!(error = %err, "Resume ignored");
            }
        }
    });
}
