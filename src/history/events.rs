//! Host events and the replay driver that feeds them to the tracker.

use crate::core::broker::Broker;
use crate::core::db::Database;
use crate::core::error::TabGraphError;
use crate::history::host::TabStrip;
use crate::history::model::{Page, RealTab, TabId};
use crate::history::tracker::{SessionImport, TabTracker};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::{info, warn};

/// One notification from the host, as recorded in a JSON-lines stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Snapshot {
        tabs: Vec<RealTab>,
    },
    Created {
        tab_id: TabId,
        #[serde(default)]
        opener_tab_id: Option<TabId>,
        position: u32,
    },
    Removed {
        tab_id: TabId,
    },
    Moved {
        tab_id: TabId,
        position: u32,
    },
    Navigated {
        tab_id: TabId,
        page: Page,
    },
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Created { .. } => "created",
            Self::Removed { .. } => "removed",
            Self::Moved { .. } => "moved",
            Self::Navigated { .. } => "navigated",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub failed: usize,
    pub import: Option<SessionImport>,
}

/// Drives a [`TabTracker`] from host events while keeping a [`TabStrip`]
/// in step, so mid-cascade position lookups see the post-event strip.
pub struct Session {
    tracker: TabTracker<TabStrip>,
    import: Option<SessionImport>,
}

impl Session {
    pub fn new(db: Database, broker: Broker) -> Self {
        Self {
            tracker: TabTracker::new(db, broker, TabStrip::new()),
            import: None,
        }
    }

    pub fn tracker(&self) -> &TabTracker<TabStrip> {
        &self.tracker
    }

    pub fn is_started(&self) -> bool {
        self.import.is_some()
    }

    /// Applies one event. The first event of a session must be the startup
    /// snapshot; any other first event starts the session from an empty strip.
    pub fn dispatch(&mut self, event: HostEvent) -> Result<(), TabGraphError> {
        if let HostEvent::Snapshot { tabs } = event {
            if self.is_started() {
                return Err(TabGraphError::ValidationError(
                    "snapshot after session start".into(),
                ));
            }
            return self.start(&tabs);
        }
        if !self.is_started() {
            self.start(&[])?;
        }

        match event {
            HostEvent::Snapshot { .. } => Ok(()),
            HostEvent::Created {
                tab_id,
                opener_tab_id,
                position,
            } => {
                let position = self.tracker.host_mut().open(tab_id, position)?;
                self.tracker.create_tab(tab_id, opener_tab_id, position)
            }
            HostEvent::Removed { tab_id } => {
                if let Err(e) = self.tracker.host_mut().close(tab_id) {
                    warn!(tab = %tab_id, error = %e, "host strip out of step on remove");
                }
                self.tracker.close_tab(tab_id)
            }
            HostEvent::Moved { tab_id, position } => {
                let position = self.tracker.host_mut().move_tab(tab_id, position)?;
                self.tracker.move_tab_manual(tab_id, position)
            }
            HostEvent::Navigated { tab_id, page } => self.tracker.navigate_to(tab_id, page),
        }
    }

    fn start(&mut self, tabs: &[RealTab]) -> Result<(), TabGraphError> {
        *self.tracker.host_mut() = TabStrip::from_snapshot(tabs)?;
        let import = self.tracker.import_session(tabs)?;
        self.import = Some(import);
        Ok(())
    }

    /// Feeds a JSON-lines event stream through [`dispatch`](Self::dispatch).
    /// A failed or unparsable event is logged and counted; replay goes on
    /// with the next line. Only a read error on the stream itself aborts.
    pub fn replay<R: BufRead>(&mut self, reader: R) -> Result<ReplaySummary, TabGraphError> {
        let mut summary = ReplaySummary::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let outcome = serde_json::from_str::<HostEvent>(trimmed)
                .map_err(TabGraphError::from)
                .and_then(|event| self.dispatch(event));
            match outcome {
                Ok(()) => summary.applied += 1,
                Err(e) => {
                    warn!(line = idx + 1, error = %e, "event failed");
                    summary.failed += 1;
                }
            }
        }
        summary.import = self.import.clone();
        info!(applied = summary.applied, failed = summary.failed, "replay finished");
        Ok(summary)
    }
}
