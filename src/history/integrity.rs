//! Consistency checks over the persisted graph and tab table.

use crate::core::error::TabGraphError;
use crate::history::model::{CreationCause, Visit, VisitId};
use crate::history::tabs::TabStore;
use crate::history::visits::VisitStore;
use rusqlite::Connection;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub visits: usize,
    pub tabs: usize,
    pub violations: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

pub fn check_integrity(conn: &Connection) -> Result<IntegrityReport, TabGraphError> {
    let visits = VisitStore::new(conn).all_visits()?;
    let tabs = TabStore::new(conn);
    let records = tabs.get_all()?;

    let mut report = IntegrityReport {
        visits: visits.len(),
        tabs: records.len(),
        violations: Vec::new(),
    };

    for position in tabs.duplicate_positions()? {
        report
            .violations
            .push(format!("position {position} held by more than one tab"));
    }

    let by_id: FxHashMap<&VisitId, &Visit> = visits.iter().map(|v| (&v.id, v)).collect();

    for record in &records {
        for (field, reference) in [
            ("current_visit", &record.current_visit),
            ("created_by_visit", &record.created_by_visit),
        ] {
            if let Some(id) = reference
                && !by_id.contains_key(id)
            {
                report.violations.push(format!(
                    "tab {} {field} points at missing visit {id}",
                    record.tab_id
                ));
            }
        }
    }

    let mut child_of: FxHashMap<&VisitId, &VisitId> = FxHashMap::default();
    for visit in &visits {
        let rooted = matches!(
            visit.creation.cause,
            CreationCause::Manual | CreationCause::Import
        );
        if rooted != visit.creation.parent_id.is_none() {
            report.violations.push(format!(
                "visit {} has cause {} but parent {:?}",
                visit.id,
                visit.creation.cause.as_str(),
                visit.creation.parent_id.as_ref().map(VisitId::as_str)
            ));
        }
        for child in &visit.children {
            if let Some(previous) = child_of.insert(child, &visit.id) {
                report.violations.push(format!(
                    "visit {child} is a child of both {previous} and {}",
                    visit.id
                ));
            }
            match by_id.get(child) {
                Some(c) if c.creation.parent_id.as_ref() != Some(&visit.id) => {
                    report.violations.push(format!(
                        "visit {child} listed under {} but names another parent",
                        visit.id
                    ));
                }
                None => report
                    .violations
                    .push(format!("visit {} lists missing child {child}", visit.id)),
                _ => {}
            }
        }
        if let Some(parent) = &visit.creation.parent_id
            && !by_id.contains_key(parent)
        {
            report
                .violations
                .push(format!("visit {} names missing parent {parent}", visit.id));
        }
    }

    // Parent pointers must bottom out at a root.
    let mut settled: FxHashSet<&VisitId> = FxHashSet::default();
    for visit in &visits {
        let mut path: FxHashSet<&VisitId> = FxHashSet::default();
        let mut cursor = Some(&visit.id);
        while let Some(id) = cursor {
            if settled.contains(id) {
                break;
            }
            if !path.insert(id) {
                report
                    .violations
                    .push(format!("parent chain of visit {} cycles at {id}", visit.id));
                break;
            }
            cursor = by_id
                .get(id)
                .and_then(|v| v.creation.parent_id.as_ref());
        }
        settled.extend(path);
    }

    Ok(report)
}
