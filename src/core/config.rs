//! Store configuration, read from `tabgraph.toml` in the store root.

use crate::core::error::TabGraphError;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Database file name, relative to the store root.
    pub db_name: String,
    pub busy_timeout_ms: u64,
    /// Append every tracker mutation to `broker.events.jsonl`.
    pub audit_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_name: schemas::DB_NAME.to_string(),
            busy_timeout_ms: 5_000,
            audit_log: true,
        }
    }
}

impl Config {
    /// Loads the config file under `root`. A missing file yields defaults.
    pub fn load(root: &Path) -> Result<Self, TabGraphError> {
        let path = root.join(schemas::CONFIG_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, TabGraphError> {
        let config: Config = toml::from_str(raw)?;
        if config.db_name.trim().is_empty() {
            return Err(TabGraphError::ConfigError("db_name must not be empty".into()));
        }
        Ok(config)
    }

    /// Writes the config to `root` unless a file is already there.
    pub fn write_default_if_missing(&self, root: &Path) -> Result<bool, TabGraphError> {
        let path = root.join(schemas::CONFIG_NAME);
        if path.exists() {
            return Ok(false);
        }
        let body = toml::to_string_pretty(self)
            .map_err(|e| TabGraphError::ConfigError(e.to_string()))?;
        fs::write(&path, body)?;
        Ok(true)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
