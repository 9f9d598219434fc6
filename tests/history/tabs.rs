use std::time::Duration;
use tabgraph::core::db::Database;
use tabgraph::core::error::TabGraphError;
use tabgraph::history::tabs::TabStore;
use tabgraph::history::{TabId, TabMove, TabRecord};
use tempfile::TempDir;

fn open(tmp: &TempDir) -> Database {
    Database::open(&tmp.path().join("tabgraph.db"), Duration::from_secs(5)).expect("open db")
}

fn record(id: i64, position: u32, visit: Option<&str>) -> TabRecord {
    TabRecord {
        tab_id: TabId(id),
        current_visit: visit.map(|v| v.parse().expect("visit id")),
        created_by_visit: None,
        tab_position: position,
    }
}

#[test]
fn records_survive_reopen_in_insertion_order() {
    let tmp = TempDir::new().expect("tempdir");
    {
        let db = open(&tmp);
        let tabs = TabStore::new(db.conn());
        tabs.put(&record(7, 2, Some("v7"))).expect("put 7");
        tabs.put(&record(3, 0, None)).expect("put 3");
        tabs.put(&record(5, 1, Some("v5"))).expect("put 5");
        // Upsert keeps the original insertion slot.
        tabs.put(&record(7, 4, Some("v7b"))).expect("update 7");
    }

    let db = open(&tmp);
    let all = TabStore::new(db.conn()).get_all().expect("get_all");
    assert_eq!(
        all.iter().map(|r| r.tab_id.0).collect::<Vec<_>>(),
        vec![7, 3, 5]
    );
    assert_eq!(all[0], record(7, 4, Some("v7b")));
}

#[test]
fn occupied_position_is_a_constraint_violation() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let tabs = TabStore::new(db.conn());
    tabs.put(&record(1, 0, None)).expect("put 1");

    let err = tabs.put(&record(2, 0, None)).expect_err("slot taken");
    assert!(matches!(err, TabGraphError::ConstraintViolation(_)), "{err}");
    assert!(tabs.get(TabId(2)).expect("get").is_none());
}

#[test]
fn get_by_position_finds_the_occupant() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let tabs = TabStore::new(db.conn());
    tabs.put(&record(1, 0, None)).expect("put 1");
    tabs.put(&record(2, 3, None)).expect("put 2");

    assert_eq!(
        tabs.get_by_position(3).expect("lookup").map(|r| r.tab_id),
        Some(TabId(2))
    );
    assert!(tabs.get_by_position(1).expect("lookup").is_none());
}

#[test]
fn replace_all_swaps_the_whole_table() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let tabs = TabStore::new(db.conn());
    tabs.put(&record(1, 0, None)).expect("put 1");
    tabs.put(&record(2, 1, None)).expect("put 2");

    tabs.replace_all(&[record(10, 1, None), record(11, 0, None)])
        .expect("replace");
    let ids: Vec<i64> = tabs
        .get_all()
        .expect("get_all")
        .into_iter()
        .map(|r| r.tab_id.0)
        .collect();
    assert_eq!(ids, vec![10, 11]);
    assert!(tabs.get(TabId(1)).expect("get").is_none());
}

#[test]
fn circular_chain_keeps_insertion_order_and_fields() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let tabs = TabStore::new(db.conn());
    tabs.put(&record(1, 0, Some("a"))).expect("put 1");
    tabs.put(&record(2, 1, Some("b"))).expect("put 2");
    tabs.put(&record(3, 2, Some("c"))).expect("put 3");

    // Tab 1 dragged to the end: 2 and 3 each shift left.
    let moves = [
        TabMove::new(TabId(2), 0),
        TabMove::new(TabId(3), 1),
        TabMove::new(TabId(1), 2),
    ];
    tabs.apply_move_chain(&moves, Some(TabId(1)))
        .expect("apply");

    let all = tabs.get_all().expect("get_all");
    assert_eq!(
        all,
        vec![record(1, 2, Some("a")), record(2, 0, Some("b")), record(3, 1, Some("c"))]
    );
    assert!(tabs.duplicate_positions().expect("dups").is_empty());
}

#[test]
fn failed_chain_leaves_table_untouched() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let tabs = TabStore::new(db.conn());
    tabs.put(&record(1, 0, None)).expect("put 1");
    tabs.put(&record(2, 1, None)).expect("put 2");

    // Second move names a tab with no record.
    let moves = [TabMove::new(TabId(2), 5), TabMove::new(TabId(9), 1)];
    let err = tabs.apply_move_chain(&moves, None).expect_err("unknown tab");
    assert!(err.is_not_found(), "{err}");
    assert_eq!(tabs.get(TabId(2)).expect("get"), Some(record(2, 1, None)));
}

#[test]
fn delete_of_unknown_tab_is_not_found() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let err = TabStore::new(db.conn())
        .delete(TabId(42))
        .expect_err("nothing to delete");
    assert!(err.is_not_found());
}
