use rusqlite::ErrorCode;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabGraphError {
    /// Operating on a tab or visit id that has no record.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A write would break a uniqueness rule (tab position, child link, end record).
    /// Always a logic defect, never transient.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Storage failure: {0}")]
    StorageFailure(rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Host error: {0}")]
    HostError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<rusqlite::Error> for TabGraphError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation(err.to_string()),
            _ => Self::StorageFailure(err),
        }
    }
}

impl From<toml::de::Error> for TabGraphError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl TabGraphError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
