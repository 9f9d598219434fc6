//! Store root: the directory holding the database, config and audit journal.

use crate::core::config::Config;
use crate::core::db::Database;
use crate::core::error::TabGraphError;
use crate::core::schemas;
use std::fs;
use std::path::PathBuf;

/// Store handle representing one tabgraph state directory.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute or working-dir relative path to the store root directory
    pub root: PathBuf,
    pub config: Config,
}

impl Store {
    /// Opens the store at `root`, reading its config (defaults when absent).
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TabGraphError> {
        let root = root.into();
        let config = Config::load(&root)?;
        Ok(Self { root, config })
    }

    /// Creates the root directory and writes a default config if none exists.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, TabGraphError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let store = Self::open(root)?;
        store.config.write_default_if_missing(&store.root)?;
        Ok(store)
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(&self.config.db_name)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join(schemas::AUDIT_LOG_NAME)
    }

    pub fn open_database(&self) -> Result<Database, TabGraphError> {
        Database::open(&self.db_path(), self.config.busy_timeout())
    }
}
