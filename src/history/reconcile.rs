//! Startup reconciliation of persisted tab records against the host snapshot.
//!
//! Tab ids do not survive a host restart, so a persisted record is matched to
//! a live tab by the position it recorded and confirmed by page URL. This is
//! a heuristic: a real continuation may be missed (reported as unknown), but a
//! tab that merely landed in the same slot with another page is never adopted.

use crate::core::error::TabGraphError;
use crate::history::model::{RealTab, TabRecord, VisitId};
use crate::history::tabs::TabStore;
use crate::history::visits::VisitStore;
use rustc_hash::FxHashMap;
use rusqlite::Connection;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Persisted records carried over, rewritten with the live tab id.
    pub confirmed: Vec<TabRecord>,
    /// Persisted records with no confirmed live counterpart.
    pub discarded: Vec<TabRecord>,
    /// Live tabs with no known history, in position order.
    pub unknown: Vec<RealTab>,
}

/// Classify every persisted record against the snapshot.
///
/// Records are processed strictly in the order given: once a live tab is
/// claimed it leaves the working set, so a later record at the same position
/// cannot claim it again. `visit_url` resolves a record's current visit to
/// the URL of its page.
pub fn reconcile<F>(
    persisted: &[TabRecord],
    snapshot: &[RealTab],
    mut visit_url: F,
) -> Result<Reconciliation, TabGraphError>
where
    F: FnMut(&VisitId) -> Result<Option<String>, TabGraphError>,
{
    let mut working: FxHashMap<u32, &RealTab> = FxHashMap::default();
    for tab in snapshot {
        if working.insert(tab.position, tab).is_some() {
            return Err(TabGraphError::ValidationError(format!(
                "snapshot reports two tabs at position {}",
                tab.position
            )));
        }
    }

    let mut out = Reconciliation::default();
    for record in persisted {
        let Some(real) = working.get(&record.tab_position).copied() else {
            debug!(tab = %record.tab_id, position = record.tab_position, "stale record, slot empty");
            out.discarded.push(record.clone());
            continue;
        };

        let confirmed = match (&record.current_visit, &real.page) {
            (None, None) => true,
            (Some(visit), Some(page)) => visit_url(visit)?.as_deref() == Some(page.url.as_str()),
            _ => false,
        };

        if confirmed {
            debug!(old = %record.tab_id, new = %real.tab_id, position = record.tab_position, "record confirmed");
            out.confirmed.push(TabRecord {
                tab_id: real.tab_id,
                ..record.clone()
            });
            working.remove(&record.tab_position);
        } else {
            debug!(tab = %record.tab_id, position = record.tab_position, "position collision, record dropped");
            out.discarded.push(record.clone());
        }
    }

    let mut unknown: Vec<RealTab> = working.into_values().cloned().collect();
    unknown.sort_by_key(|t| t.position);
    out.unknown = unknown;
    Ok(out)
}

/// Reconcile the persisted tab table against `snapshot` and replace the
/// table with the confirmed records. Runs inside the caller's transaction
/// when there is one.
pub fn reconcile_store(
    conn: &Connection,
    snapshot: &[RealTab],
) -> Result<Reconciliation, TabGraphError> {
    let tabs = TabStore::new(conn);
    let visits = VisitStore::new(conn);

    let persisted = tabs.get_all()?;
    let result = reconcile(&persisted, snapshot, |id| {
        Ok(visits.get_visit(id)?.map(|v| v.page.url))
    })?;
    tabs.replace_all(&result.confirmed)?;

    info!(
        persisted = persisted.len(),
        confirmed = result.confirmed.len(),
        discarded = result.discarded.len(),
        unknown = result.unknown.len(),
        "session reconciled"
    );
    Ok(result)
}
