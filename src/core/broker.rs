use crate::core::error::TabGraphError;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The broker is the single path every tracker mutation takes.
/// It times the operation, logs it, and appends it to the audit journal.
pub struct Broker {
    audit_log_path: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub subject: Option<String>,
    pub status: String,
    pub error: Option<String>,
}

impl Broker {
    pub fn new(audit_log_path: &Path) -> Self {
        Self {
            audit_log_path: Some(audit_log_path.to_path_buf()),
        }
    }

    /// A broker that logs but keeps no journal.
    pub fn unjournaled() -> Self {
        Self {
            audit_log_path: None,
        }
    }

    /// Run `f` as operation `op_name` on `subject` and record the outcome.
    ///
    /// The result of `f` is returned as is: by the time the journal is
    /// written the mutation has committed, so a journal failure is only
    /// logged.
    pub fn run<F, R>(&self, op_name: &str, subject: Option<&str>, f: F) -> Result<R, TabGraphError>
    where
        F: FnOnce() -> Result<R, TabGraphError>,
    {
        let result = f();

        let (status, error) = match &result {
            Ok(_) => ("success", None),
            Err(e) => ("error", Some(e.to_string())),
        };
        debug!(op = op_name, subject, status, "broker op");
        if let Err(e) = self.log_event(op_name, subject, status, error) {
            warn!(op = op_name, subject, error = %e, "audit journal append failed");
        }

        result
    }

    fn log_event(
        &self,
        op: &str,
        subject: Option<&str>,
        status: &str,
        error: Option<String>,
    ) -> Result<(), TabGraphError> {
        let Some(path) = &self.audit_log_path else {
            return Ok(());
        };

        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            op: op.to_string(),
            subject: subject.map(|s| s.to_string()),
            status: status.to_string(),
            error,
        };

        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?)?;
        Ok(())
    }
}

/// Reads back the audit journal, skipping lines that fail to parse.
pub fn read_journal(path: &Path) -> Result<Vec<BrokerEvent>, TabGraphError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str::<BrokerEvent>(line).ok())
        .collect())
}
