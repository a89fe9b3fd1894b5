use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Serialize `value` to stdout in a machine format. Human output is the
/// caller's job, so it falls back to pretty JSON here.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to render YAML")?,
        OutputFormat::Human | OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to render JSON")?
        }
    };
    println!("{rendered}");
    Ok(())
}
