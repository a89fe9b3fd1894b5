use std::path::PathBuf;

use anyhow::{Context, Result};
use autofill_plan::Plan;
use page_adapter::FixtureSpec;
use tokio::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{self, LoadedConfig};

/// Install the global subscriber. `RUST_LOG` overrides `level`; output goes
/// to stderr so stdout stays machine-readable.
pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level: tracing::Level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

pub fn load_config(path: Option<&PathBuf>) -> Result<LoadedConfig> {
    config::load_config(path.map(PathBuf::as_path)).context("Failed to load configuration")
}

pub async fn read_plan(path: &PathBuf) -> Result<Plan> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    Plan::from_json(&content).with_context(|| format!("Failed to parse plan {}", path.display()))
}

pub async fn read_fixture(path: &PathBuf) -> Result<FixtureSpec> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fixture file {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let spec = if is_json {
        FixtureSpec::from_json(&content)
    } else {
        FixtureSpec::from_yaml(&content)
    };
    spec.with_context(|| format!("Failed to parse fixture {}", path.display()))
}
