//! Runtime settings: defaults, optional JSON file, environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinator::CoordinatorOptions;

pub const ENV_CONFIG: &str = "KANNDEUTSCH_CONFIG";
pub const ENV_DB_PATH: &str = "KANNDEUTSCH_DB_PATH";
pub const ENV_DEBOUNCE_MS: &str = "KANNDEUTSCH_DEBOUNCE_MS";
pub const ENV_RESULT_LIMIT: &str = "KANNDEUTSCH_RESULT_LIMIT";
pub const ENV_DISCOVERY_SIZE: &str = "KANNDEUTSCH_DISCOVERY_SIZE";
pub const ENV_LOG: &str = "KANNDEUTSCH_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub debounce_ms: u64,
    pub result_limit: usize,
    /// Size of the random sample shown when the query is empty.
    pub discovery_size: usize,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("output.db"),
            debounce_ms: 300,
            result_limit: 200,
            discovery_size: 50,
            log_filter: "kanndeutsch=info".to_string(),
        }
    }
}

impl Settings {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Defaults, then the file named by `KANNDEUTSCH_CONFIG`, then individual
    /// environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = match lookup(ENV_CONFIG) {
            Some(path) => Self::load_from_file(Path::new(&path))?,
            None => Self::default(),
        };
        settings.apply_overrides(lookup)?;
        Ok(settings)
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            self.debounce_ms = parse_number(ENV_DEBOUNCE_MS, raw)?;
        }
        if let Some(raw) = lookup(ENV_RESULT_LIMIT) {
            self.result_limit = parse_number(ENV_RESULT_LIMIT, raw)?;
        }
        if let Some(raw) = lookup(ENV_DISCOVERY_SIZE) {
            self.discovery_size = parse_number(ENV_DISCOVERY_SIZE, raw)?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            debounce: self.debounce(),
            result_limit: self.result_limit,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}
