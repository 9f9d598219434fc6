//! Session façade: the operations the host event layer calls.
//!
//! Events arrive strictly serially per host instance. Nothing here locks
//! against two concurrent operations on the same tab id; that is a
//! precondition on the caller.

use crate::core::broker::Broker;
use crate::core::db::{Database, with_tx};
use crate::core::error::TabGraphError;
use crate::core::time;
use crate::history::host::TabHost;
use crate::history::model::{End, EndCause, NewVisit, Page, RealTab, TabId, TabRecord};
use crate::history::move_chain;
use crate::history::reconcile;
use crate::history::tabs::TabStore;
use crate::history::visits::VisitStore;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of the startup import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionImport {
    /// Persisted records carried over to a live tab.
    pub matched: usize,
    /// Persisted records dropped as stale or colliding.
    pub discarded: usize,
    /// Live tabs given a fresh record (and an import visit when loaded).
    pub imported: Vec<TabId>,
}

pub struct TabTracker<H> {
    db: Database,
    broker: Broker,
    host: H,
}

impl<H: TabHost> TabTracker<H> {
    pub fn new(db: Database, broker: Broker, host: H) -> Self {
        Self { db, broker, host }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Reconcile persisted tabs with the host's startup snapshot, then give
    /// every tab of unknown provenance a fresh record. All of it commits in
    /// one transaction or not at all.
    pub fn import_session(&self, snapshot: &[RealTab]) -> Result<SessionImport, TabGraphError> {
        self.broker.run("session.import", None, || {
            with_tx(self.db.conn(), |conn| {
                let result = reconcile::reconcile_store(conn, snapshot)?;

                let tabs = TabStore::new(conn);
                let visits = VisitStore::new(conn);
                let now = time::now_millis();
                let mut imported = Vec::with_capacity(result.unknown.len());
                for tab in &result.unknown {
                    let current_visit = match &tab.page {
                        Some(page) => Some(visits.create_visit(&NewVisit::import(page.clone(), now))?),
                        None => None,
                    };
                    tabs.put(&TabRecord {
                        tab_id: tab.tab_id,
                        current_visit,
                        created_by_visit: None,
                        tab_position: tab.position,
                    })?;
                    imported.push(tab.tab_id);
                }

                info!(imported = imported.len(), "unknown tabs imported");
                Ok(SessionImport {
                    matched: result.confirmed.len(),
                    discarded: result.discarded.len(),
                    imported,
                })
            })
        })
    }

    /// Record a newly opened tab. The opener's current visit, if any, becomes
    /// the tab's creator. Records at or after `position` move back one slot,
    /// as they do in the strip.
    pub fn create_tab(
        &self,
        tab_id: TabId,
        opener: Option<TabId>,
        position: u32,
    ) -> Result<(), TabGraphError> {
        let subject = tab_id.to_string();
        self.broker.run("tab.create", Some(&subject), || {
            with_tx(self.db.conn(), |conn| {
                let tabs = TabStore::new(conn);
                if tabs.get(tab_id)?.is_some() {
                    return Err(TabGraphError::ConstraintViolation(format!(
                        "tab {tab_id} is already tracked"
                    )));
                }
                let created_by_visit = match opener {
                    Some(opener) => tabs.get(opener)?.and_then(|r| r.current_visit),
                    None => None,
                };
                let shifted = tabs.open_slot(position)?;
                tabs.put(&TabRecord {
                    tab_id,
                    current_visit: None,
                    created_by_visit,
                    tab_position: position,
                })?;
                debug!(tab = %tab_id, position, shifted, "tab created");
                Ok(())
            })
        })
    }

    /// Record a closed tab: end its current visit, then drop the record and
    /// pull later records one slot forward. Closing an untracked tab is a
    /// logged no-op.
    pub fn close_tab(&self, tab_id: TabId) -> Result<(), TabGraphError> {
        let subject = tab_id.to_string();
        self.broker.run("tab.close", Some(&subject), || {
            with_tx(self.db.conn(), |conn| {
                let tabs = TabStore::new(conn);
                let Some(record) = tabs.get(tab_id)? else {
                    warn!(tab = %tab_id, "close for untracked tab ignored");
                    return Ok(());
                };

                if let Some(current) = &record.current_visit {
                    let visits = VisitStore::new(conn);
                    match visits.get_visit(current)? {
                        Some(visit) => {
                            let end = End {
                                cause: EndCause::Manual,
                                time: time::now_millis(),
                            };
                            visits.update_visit(&visit.ended(end))?;
                        }
                        None => warn!(tab = %tab_id, visit = %current, "current visit missing on close"),
                    }
                }

                let position = tabs.remove(tab_id)?;
                debug!(tab = %tab_id, position, "tab closed");
                Ok(())
            })
        })
    }

    /// Record a committed top-level navigation in `tab_id`.
    ///
    /// The first page in a tab descends from the visit that opened the tab;
    /// later pages descend from, and end, the page they replace. With no
    /// parent at all the visit is a manual root.
    pub fn navigate_to(&self, tab_id: TabId, page: Page) -> Result<(), TabGraphError> {
        let subject = tab_id.to_string();
        self.broker.run("tab.navigate", Some(&subject), || {
            with_tx(self.db.conn(), |conn| {
                let tabs = TabStore::new(conn);
                let visits = VisitStore::new(conn);
                let Some(record) = tabs.get(tab_id)? else {
                    warn!(tab = %tab_id, url = %page.url, "navigation in untracked tab ignored");
                    return Ok(());
                };

                let is_new_tab = record.current_visit.is_none();
                let parent = if is_new_tab {
                    record.created_by_visit.clone()
                } else {
                    record.current_visit.clone()
                };
                let replaced_parent = !is_new_tab;

                let now = time::now_millis();
                let visit_id = visits.create_visit(&NewVisit::navigation(
                    page,
                    parent.clone().map(|p| (p, replaced_parent)),
                    now,
                ))?;

                tabs.put(&TabRecord {
                    current_visit: Some(visit_id.clone()),
                    ..record
                })?;

                if let Some(parent) = parent {
                    let mut updated = visits.require_visit(&parent)?.with_child(visit_id.clone());
                    if replaced_parent {
                        updated = updated.ended(End {
                            cause: EndCause::Navigation,
                            time: now,
                        });
                    }
                    visits.update_visit(&updated)?;
                }
                debug!(tab = %tab_id, visit = %visit_id, "navigation recorded");
                Ok(())
            })
        })
    }

    /// Record a manual reorder of `tab_id` to `new_index`, including every
    /// tab it displaced.
    pub fn move_tab_manual(&self, tab_id: TabId, new_index: u32) -> Result<(), TabGraphError> {
        let subject = tab_id.to_string();
        self.broker.run("tab.move", Some(&subject), || {
            move_chain::move_tab(self.db.conn(), &self.host, tab_id, new_index).map(|_| ())
        })
    }
}
