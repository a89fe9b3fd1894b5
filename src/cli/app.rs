use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::env::{CliArgs, Commands};
use super::run::cmd_run;
use super::runtime::{init_logging, load_config};
use super::validate::cmd_validate;

pub async fn run() -> Result<ExitCode> {
    let cli = CliArgs::parse();

    let loaded = load_config(cli.config.as_ref())?;
    let config = loaded.config;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, cli.debug, cli.json_logs || config.logging.json)?;

    info!("Starting autofill v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &loaded.path {
        info!("Using configuration from: {}", path.display());
    }

    let result = match cli.command.clone() {
        Commands::Validate(args) => cmd_validate(args, cli.output).await,
        Commands::Run(args) => cmd_run(args, &config, cli.output).await,
    };

    match result {
        Ok(code) => {
            info!("Command finished");
            Ok(code)
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
