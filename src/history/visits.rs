//! Visit store: append-mostly persistence of the navigation graph.
//!
//! Pages and creation data are immutable once written. The only mutations
//! are appending to `children` and setting `end` once.

use crate::core::error::TabGraphError;
use crate::history::model::{
    Creation, CreationCause, End, EndCause, NewVisit, Page, Visit, VisitId,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

const VISIT_COLUMNS: &str = "id, title, url, icon, creation_cause, parent_id, replaced_parent, created_at, end_cause, ended_at";

pub struct VisitStore<'c> {
    conn: &'c Connection,
}

impl<'c> VisitStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn create_visit(&self, data: &NewVisit) -> Result<VisitId, TabGraphError> {
        let id = VisitId::generate();
        self.conn.execute(
            "INSERT INTO visits(id, title, url, icon, creation_cause, parent_id, replaced_parent, created_at, end_cause, ended_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, NULL)",
            params![
                id,
                data.page.title,
                data.page.url,
                data.page.icon,
                data.creation.cause,
                data.creation.parent_id,
                data.creation.replaced_parent,
                data.creation.time,
            ],
        )?;
        debug!(visit = %id, cause = data.creation.cause.as_str(), url = %data.page.url, "visit created");
        Ok(id)
    }

    pub fn get_visit(&self, id: &VisitId) -> Result<Option<Visit>, TabGraphError> {
        let sql = format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = ?1");
        let head = self
            .conn
            .query_row(&sql, params![id], visit_from_row)
            .optional()?;
        match head {
            Some(mut visit) => {
                visit.children = self.children_of(&visit.id)?;
                Ok(Some(visit))
            }
            None => Ok(None),
        }
    }

    pub fn require_visit(&self, id: &VisitId) -> Result<Visit, TabGraphError> {
        self.get_visit(id)?
            .ok_or_else(|| TabGraphError::NotFound(format!("visit {id}")))
    }

    /// Writes back a visit previously read with [`get_visit`](Self::get_visit)
    /// and transformed with the pure helpers on [`Visit`].
    ///
    /// Read, transform, write is not atomic against another writer of the same
    /// visit. Callers must not update one visit from two places at once.
    pub fn update_visit(&self, updated: &Visit) -> Result<(), TabGraphError> {
        let stored = self.require_visit(&updated.id)?;

        if stored.page != updated.page || stored.creation != updated.creation {
            return Err(TabGraphError::ConstraintViolation(format!(
                "visit {} page and creation are immutable",
                updated.id
            )));
        }
        if !updated.children.starts_with(&stored.children) {
            return Err(TabGraphError::ConstraintViolation(format!(
                "visit {} children are append-only",
                updated.id
            )));
        }
        match (stored.end, updated.end) {
            (Some(old), Some(new)) if old != new => {
                return Err(TabGraphError::ConstraintViolation(format!(
                    "visit {} already ended",
                    updated.id
                )));
            }
            (Some(_), None) => {
                return Err(TabGraphError::ConstraintViolation(format!(
                    "visit {} end cannot be cleared",
                    updated.id
                )));
            }
            (None, Some(end)) => {
                self.conn.execute(
                    "UPDATE visits SET end_cause = ?1, ended_at = ?2 WHERE id = ?3",
                    params![end.cause, end.time, updated.id],
                )?;
                debug!(visit = %updated.id, cause = end.cause.as_str(), "visit ended");
            }
            _ => {}
        }

        for child in &updated.children[stored.children.len()..] {
            if child == &updated.id {
                return Err(TabGraphError::ConstraintViolation(format!(
                    "visit {child} cannot be its own child"
                )));
            }
            self.conn.execute(
                "INSERT INTO visit_children(parent_id, child_id) VALUES(?1, ?2)",
                params![updated.id, child],
            )?;
            debug!(parent = %updated.id, child = %child, "child linked");
        }
        Ok(())
    }

    pub fn children_of(&self, id: &VisitId) -> Result<Vec<VisitId>, TabGraphError> {
        let mut stmt = self
            .conn
            .prepare("SELECT child_id FROM visit_children WHERE parent_id = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<VisitId>, _>>()?)
    }

    /// All visits, oldest first.
    pub fn all_visits(&self) -> Result<Vec<Visit>, TabGraphError> {
        let sql = format!("SELECT {VISIT_COLUMNS} FROM visits ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let heads = stmt
            .query_map([], visit_from_row)?
            .collect::<Result<Vec<Visit>, _>>()?;
        let mut visits = Vec::with_capacity(heads.len());
        for mut visit in heads {
            visit.children = self.children_of(&visit.id)?;
            visits.push(visit);
        }
        Ok(visits)
    }

    /// Visit ids from the root of `id`'s tree down to `id` itself.
    pub fn lineage(&self, id: &VisitId) -> Result<Vec<VisitId>, TabGraphError> {
        let mut chain = vec![id.clone()];
        let mut cursor = self.require_visit(id)?.creation.parent_id;
        while let Some(parent) = cursor {
            if chain.contains(&parent) {
                return Err(TabGraphError::ConstraintViolation(format!(
                    "parent chain of visit {id} cycles through {parent}"
                )));
            }
            let next: Option<Option<VisitId>> = self
                .conn
                .query_row(
                    "SELECT parent_id FROM visits WHERE id = ?1",
                    params![parent],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(next) = next else {
                return Err(TabGraphError::NotFound(format!("visit {parent}")));
            };
            chain.push(parent);
            cursor = next;
        }
        chain.reverse();
        Ok(chain)
    }
}

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
    let end_cause: Option<EndCause> = row.get(8)?;
    let ended_at: Option<i64> = row.get(9)?;
    let end = match (end_cause, ended_at) {
        (Some(cause), Some(time)) => Some(End { cause, time }),
        _ => None,
    };
    let cause: CreationCause = row.get(4)?;
    Ok(Visit {
        id: row.get(0)?,
        page: Page {
            title: row.get(1)?,
            url: row.get(2)?,
            icon: row.get(3)?,
        },
        creation: Creation {
            cause,
            parent_id: row.get(5)?,
            replaced_parent: row.get(6)?,
            time: row.get(7)?,
        },
        children: Vec::new(),
        end,
    })
}
