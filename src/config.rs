use std::env;
use std::path::{Path, PathBuf};

use action_flow::EngineConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Prefix of environment overrides, e.g. `AUTOFILL_NAVIGATION_TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "AUTOFILL_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Config plus the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn from_yaml(source: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `AUTOFILL_*` overrides read through `lookup`.
    ///
    /// Timeout ceilings accept `0` or `none` to restore the unbounded wait.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine = &mut self.engine;
        override_value(&lookup, "POLL_INTERVAL_MS", &mut engine.poll_interval_ms)?;
        override_value(&lookup, "SETTLE_DELAY_MS", &mut engine.settle_delay_ms)?;
        override_value(&lookup, "CLICK_SETTLE_MS", &mut engine.click_settle_ms)?;
        override_value(&lookup, "RESOLVER_ROUNDS", &mut engine.resolver_rounds)?;
        override_value(&lookup, "RESOLVER_INTERVAL_MS", &mut engine.resolver_interval_ms)?;
        override_value(&lookup, "WAIT_TIMEOUT_MS", &mut engine.wait_timeout_ms)?;
        override_value(&lookup, "DEFAULT_SLEEP_MS", &mut engine.default_sleep_ms)?;
        override_value(&lookup, "CONFIDENCE_THRESHOLD", &mut engine.confidence_threshold)?;
        override_value(
            &lookup,
            "ERROR_NOTICE_DISMISS_MS",
            &mut engine.error_notice_dismiss_ms,
        )?;
        override_ceiling(&lookup, "NAVIGATION_TIMEOUT_MS", &mut engine.navigation_timeout_ms)?;
        override_ceiling(
            &lookup,
            "INTERVENTION_TIMEOUT_MS",
            &mut engine.intervention_timeout_ms,
        )?;

        if let Some(level) = lookup(&format!("{ENV_PREFIX}LOG_LEVEL")) {
            self.logging.level = level;
        }
        override_value(&lookup, "JSON_LOGS", &mut self.logging.json)?;
        Ok(())
    }
}

fn override_value<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let key = format!("{ENV_PREFIX}{key}");
    if let Some(raw) = lookup(&key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidOverride { key, value: raw })?;
    }
    Ok(())
}

fn override_ceiling<F>(lookup: &F, key: &str, slot: &mut Option<u64>) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let key = format!("{ENV_PREFIX}{key}");
    if let Some(raw) = lookup(&key) {
        let trimmed = raw.trim();
        *slot = if trimmed.eq_ignore_ascii_case("none") {
            None
        } else {
            match trimmed.parse::<u64>() {
                Ok(0) => None,
                Ok(ms) => Some(ms),
                Err(_) => return Err(ConfigError::InvalidOverride { key, value: raw }),
            }
        };
    }
    Ok(())
}

/// Where to look for a config file when none is given explicitly.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("config/autofill.yaml")];
    if let Some(mut dir) = dirs::config_dir() {
        dir.push("autofill");
        dir.push("config.yaml");
        paths.push(dir);
    }
    paths
}

/// Load configuration.
///
/// Priority: `explicit` (must exist) > `./config/autofill.yaml` >
/// `<config dir>/autofill/config.yaml` > defaults. Environment overrides are
/// applied last.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_paths().into_iter().find(|path| path.exists()),
    };

    let mut config = match &path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let config = Config::from_yaml(&content, path)?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => {
            warn!("Config file not found, using defaults");
            Config::default()
        }
    };

    config.apply_overrides(|key| env::var(key).ok())?;
    Ok(LoadedConfig { config, path })
}
