//! Move-chain resolution.
//!
//! The host only reports "tab X moved to P". Every tab between X's old slot
//! and P shifted by one as a side effect, and none of them is reported. The
//! resolver walks the persisted (still pre-move) positions starting at P and
//! asks the host where each displaced occupant is now, until it reaches an
//! empty slot or comes back around to X.

use crate::core::error::TabGraphError;
use crate::history::host::TabHost;
use crate::history::model::{TabId, TabMove};
use crate::history::tabs::TabStore;
use rusqlite::Connection;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeEnd {
    /// The last target slot had no persisted occupant.
    EmptySlot,
    /// The last target slot belonged to the tab that started the chain.
    ReturnedToOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    /// Secondary moves, ordered so that applying them front to back never
    /// writes a position still held by a later entry.
    pub moves: Vec<TabMove>,
    pub end: CascadeEnd,
}

/// Derive every move implied by one tab landing on `target`.
///
/// Must run before any position in the chain is written: the persisted table
/// is read as the pre-move state. `stop` is the tab whose move started the
/// chain.
pub fn resolve_cascade<H: TabHost>(
    tabs: &TabStore<'_>,
    host: &H,
    target: u32,
    stop: TabId,
) -> Result<Cascade, TabGraphError> {
    let mut stack: Vec<TabMove> = Vec::new();
    let mut visited: FxHashSet<TabId> = FxHashSet::default();
    let mut target = target;

    let end = loop {
        let Some(occupant) = tabs.get_by_position(target)? else {
            break CascadeEnd::EmptySlot;
        };
        if occupant.tab_id == stop {
            break CascadeEnd::ReturnedToOrigin;
        }
        if !visited.insert(occupant.tab_id) {
            return Err(TabGraphError::ConstraintViolation(format!(
                "cascade revisited tab {} at position {target}",
                occupant.tab_id
            )));
        }
        let now = host.tab_position(occupant.tab_id)?.ok_or_else(|| {
            TabGraphError::NotFound(format!("host has no tab {}", occupant.tab_id))
        })?;
        debug!(tab = %occupant.tab_id, from = target, to = now, "displaced");
        stack.push(TabMove::new(occupant.tab_id, now));
        target = now;
    };

    // Deepest displacement first: each entry's target was vacated by the
    // entry applied before it.
    stack.reverse();
    Ok(Cascade { moves: stack, end })
}

/// A resolved move: the cascade plus the originating move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveChain {
    pub cascade: Vec<TabMove>,
    pub origin: TabMove,
    /// The cascade ends in the moving tab's old slot, so the moving tab must
    /// leave the table before the cascade is written.
    pub circular: bool,
}

impl MoveChain {
    pub fn new(cascade: Cascade, origin: TabMove) -> Self {
        let circular = cascade.end == CascadeEnd::ReturnedToOrigin && !cascade.moves.is_empty();
        Self {
            cascade: cascade.moves,
            origin,
            circular,
        }
    }

    /// Cascade moves followed by the originating move.
    pub fn moves(&self) -> Vec<TabMove> {
        let mut moves = self.cascade.clone();
        moves.push(self.origin);
        moves
    }

    pub fn evict(&self) -> Option<TabId> {
        self.circular.then_some(self.origin.tab_id)
    }
}

/// Resolve and commit the move of `tab_id` to `new_index`.
pub fn move_tab<H: TabHost>(
    conn: &Connection,
    host: &H,
    tab_id: TabId,
    new_index: u32,
) -> Result<MoveChain, TabGraphError> {
    let tabs = TabStore::new(conn);
    let record = tabs.require(tab_id)?;

    let cascade = resolve_cascade(&tabs, host, new_index, tab_id)?;
    let chain = MoveChain::new(cascade, TabMove::new(tab_id, new_index));
    tabs.apply_move_chain(&chain.moves(), chain.evict())?;

    info!(
        tab = %tab_id,
        from = record.tab_position,
        to = new_index,
        displaced = chain.cascade.len(),
        circular = chain.circular,
        "tab moved"
    );
    Ok(chain)
}
