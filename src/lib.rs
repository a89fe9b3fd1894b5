//! Autofill CLI library
//!
//! Configuration loading and the `validate` / `run` commands, exposed for
//! integration testing.

pub mod cli;
pub mod config;

pub use config::{load_config, Config, ConfigError, LoadedConfig, LoggingConfig};
