//! Tab position store: one row per live tab, unique on `tab_position`.
//!
//! The unique position index is enforced by SQLite on every statement, so
//! multi-row rewrites ([`TabStore::replace_all`], [`TabStore::apply_move_chain`],
//! [`TabStore::remove`], [`TabStore::open_slot`]) must order their writes so no
//! intermediate statement duplicates a position. Each runs in a single
//! transaction (the caller's, if one is open); an error drops the transaction
//! and leaves the table as it was.

use crate::core::db::with_tx;
use crate::core::error::TabGraphError;
use crate::history::model::{TabId, TabMove, TabRecord};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

const TAB_COLUMNS: &str = "tab_id, current_visit, created_by_visit, tab_position";

#[derive(Clone, Copy)]
enum Shift {
    Up,
    Down,
}

pub struct TabStore<'c> {
    conn: &'c Connection,
}

impl<'c> TabStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, tab_id: TabId) -> Result<Option<TabRecord>, TabGraphError> {
        let sql = format!("SELECT {TAB_COLUMNS} FROM tabs WHERE tab_id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![tab_id], record_from_row)
            .optional()?)
    }

    pub fn require(&self, tab_id: TabId) -> Result<TabRecord, TabGraphError> {
        self.get(tab_id)?
            .ok_or_else(|| TabGraphError::NotFound(format!("tab {tab_id}")))
    }

    /// Insert or overwrite the record for `record.tab_id`. An existing row keeps
    /// its place in insertion order.
    pub fn put(&self, record: &TabRecord) -> Result<(), TabGraphError> {
        self.conn.execute(
            "INSERT INTO tabs(tab_id, current_visit, created_by_visit, tab_position)
             VALUES(?1, ?2, ?3, ?4)
             ON CONFLICT(tab_id) DO UPDATE SET
                current_visit = excluded.current_visit,
                created_by_visit = excluded.created_by_visit,
                tab_position = excluded.tab_position",
            params![
                record.tab_id,
                record.current_visit,
                record.created_by_visit,
                record.tab_position
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, tab_id: TabId) -> Result<(), TabGraphError> {
        let removed = self
            .conn
            .execute("DELETE FROM tabs WHERE tab_id = ?1", params![tab_id])?;
        if removed == 0 {
            return Err(TabGraphError::NotFound(format!("tab {tab_id}")));
        }
        Ok(())
    }

    /// All records in insertion order (not position order).
    pub fn get_all(&self) -> Result<Vec<TabRecord>, TabGraphError> {
        let sql = format!("SELECT {TAB_COLUMNS} FROM tabs ORDER BY seq");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_by_position(&self, position: u32) -> Result<Option<TabRecord>, TabGraphError> {
        let sql = format!("SELECT {TAB_COLUMNS} FROM tabs WHERE tab_position = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![position], record_from_row)
            .optional()?)
    }

    /// Clear the table and insert `records` in order, in one transaction.
    pub fn replace_all(&self, records: &[TabRecord]) -> Result<(), TabGraphError> {
        with_tx(self.conn, |conn| {
            let cleared = conn.execute("DELETE FROM tabs", [])?;
            for record in records {
                conn.execute(
                    "INSERT INTO tabs(tab_id, current_visit, created_by_visit, tab_position)
                     VALUES(?1, ?2, ?3, ?4)",
                    params![
                        record.tab_id,
                        record.current_visit,
                        record.created_by_visit,
                        record.tab_position
                    ],
                )?;
            }
            info!(cleared, inserted = records.len(), "tab table replaced");
            Ok(())
        })
    }

    /// Delete `tab_id` and pull every record behind it one slot forward, the
    /// way the strip closes the gap. Returns the freed position.
    pub fn remove(&self, tab_id: TabId) -> Result<u32, TabGraphError> {
        with_tx(self.conn, |conn| {
            let tabs = TabStore::new(conn);
            let record = tabs.require(tab_id)?;
            tabs.delete(tab_id)?;
            // Ascending: each target slot was vacated by the previous write.
            let shifted = tabs.shift_from(record.tab_position + 1, Shift::Down)?;
            debug!(tab = %tab_id, position = record.tab_position, shifted, "gap closed");
            Ok(record.tab_position)
        })
    }

    /// Push every record at or after `position` one slot back so a tab can be
    /// inserted there. Returns how many records moved.
    pub fn open_slot(&self, position: u32) -> Result<usize, TabGraphError> {
        with_tx(self.conn, |conn| TabStore::new(conn).shift_from(position, Shift::Up))
    }

    fn shift_from(&self, position: u32, shift: Shift) -> Result<usize, TabGraphError> {
        let order = match shift {
            Shift::Down => "ASC",
            Shift::Up => "DESC",
        };
        let sql = format!(
            "SELECT tab_id, tab_position FROM tabs WHERE tab_position >= ?1 ORDER BY tab_position {order}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![position], |row| Ok((row.get::<_, TabId>(0)?, row.get::<_, u32>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (tab_id, current) in &rows {
            let next = match shift {
                Shift::Down => current - 1,
                Shift::Up => current + 1,
            };
            self.conn.execute(
                "UPDATE tabs SET tab_position = ?1 WHERE tab_id = ?2",
                params![next, tab_id],
            )?;
        }
        Ok(rows.len())
    }

    /// Apply a move chain in one transaction.
    ///
    /// `moves` is applied front to back; every entry rewrites only the
    /// position of an existing record. When `evict` is set, that tab's record
    /// is removed before any move is written and re-inserted (same insertion
    /// slot, other fields untouched) at its own target position once every
    /// other move has landed. This is how circular chains get past the unique
    /// position index.
    pub fn apply_move_chain(
        &self,
        moves: &[TabMove],
        evict: Option<TabId>,
    ) -> Result<(), TabGraphError> {
        with_tx(self.conn, |conn| {
            let tabs = TabStore::new(conn);

            let evicted = match evict {
                Some(tab_id) => {
                    let target = moves
                        .iter()
                        .rev()
                        .find(|m| m.tab_id == tab_id)
                        .ok_or_else(|| {
                            TabGraphError::ValidationError(format!(
                                "evicted tab {tab_id} has no move in the chain"
                            ))
                        })?
                        .tab_position;
                    let (seq, record) = tabs.require_with_seq(tab_id)?;
                    conn.execute("DELETE FROM tabs WHERE tab_id = ?1", params![tab_id])?;
                    debug!(tab = %tab_id, from = record.tab_position, "evicted for circular chain");
                    Some((seq, TabRecord { tab_position: target, ..record }))
                }
                None => None,
            };

            for mv in moves {
                if evict == Some(mv.tab_id) {
                    continue;
                }
                let record = tabs.require(mv.tab_id)?;
                debug!(tab = %mv.tab_id, from = record.tab_position, to = mv.tab_position, "move");
                tabs.put(&TabRecord {
                    tab_position: mv.tab_position,
                    ..record
                })?;
            }

            if let Some((seq, record)) = evicted {
                conn.execute(
                    "INSERT INTO tabs(seq, tab_id, current_visit, created_by_visit, tab_position)
                     VALUES(?1, ?2, ?3, ?4, ?5)",
                    params![
                        seq,
                        record.tab_id,
                        record.current_visit,
                        record.created_by_visit,
                        record.tab_position
                    ],
                )?;
                debug!(tab = %record.tab_id, to = record.tab_position, "re-inserted");
            }
            Ok(())
        })
    }

    /// Positions held by more than one record. Always empty while the unique
    /// index is in place; used by integrity checks on foreign databases.
    pub fn duplicate_positions(&self) -> Result<Vec<u32>, TabGraphError> {
        let mut stmt = self.conn.prepare(
            "SELECT tab_position FROM tabs GROUP BY tab_position HAVING COUNT(*) > 1 ORDER BY tab_position",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<u32>, _>>()?)
    }

    fn require_with_seq(&self, tab_id: TabId) -> Result<(i64, TabRecord), TabGraphError> {
        let sql = format!("SELECT seq, {TAB_COLUMNS} FROM tabs WHERE tab_id = ?1");
        self.conn
            .query_row(&sql, params![tab_id], |row| {
                Ok((
                    row.get(0)?,
                    TabRecord {
                        tab_id: row.get(1)?,
                        current_visit: row.get(2)?,
                        created_by_visit: row.get(3)?,
                        tab_position: row.get(4)?,
                    },
                ))
            })
            .optional()?
            .ok_or_else(|| TabGraphError::NotFound(format!("tab {tab_id}")))
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TabRecord> {
    Ok(TabRecord {
        tab_id: row.get(0)?,
        current_visit: row.get(1)?,
        created_by_visit: row.get(2)?,
        tab_position: row.get(3)?,
    })
}
