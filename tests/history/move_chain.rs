use std::time::Duration;
use tabgraph::core::db::Database;
use tabgraph::history::move_chain::{move_tab, resolve_cascade, CascadeEnd};
use tabgraph::history::tabs::TabStore;
use tabgraph::history::{TabId, TabMove, TabRecord, TabStrip};
use tempfile::TempDir;

fn open(tmp: &TempDir) -> Database {
    Database::open(&tmp.path().join("tabgraph.db"), Duration::from_secs(5)).expect("open db")
}

/// Seeds `n` tabs with ids 0..n at matching positions and returns the strip.
fn seed_strip(db: &Database, n: i64) -> TabStrip {
    let tabs = TabStore::new(db.conn());
    for id in 0..n {
        tabs.put(&TabRecord {
            tab_id: TabId(id),
            current_visit: None,
            created_by_visit: None,
            tab_position: id as u32,
        })
        .expect("put tab");
    }
    TabStrip::from_order((0..n).map(TabId))
}

fn layout(db: &Database) -> Vec<(i64, u32)> {
    let mut all: Vec<(i64, u32)> = TabStore::new(db.conn())
        .get_all()
        .expect("get_all")
        .into_iter()
        .map(|r| (r.tab_id.0, r.tab_position))
        .collect();
    all.sort();
    all
}

fn expected(strip: &TabStrip) -> Vec<(i64, u32)> {
    let mut all: Vec<(i64, u32)> = strip
        .order()
        .iter()
        .enumerate()
        .map(|(pos, id)| (id.0, pos as u32))
        .collect();
    all.sort();
    all
}

#[test]
fn three_tab_rotation_matches_the_host() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    // Strip [X, Y, Z] as tabs 0, 1, 2; X dragged to index 2.
    let mut strip = seed_strip(&db, 3);
    strip.move_tab(TabId(0), 2).expect("host move");

    let chain = move_tab(db.conn(), &strip, TabId(0), 2).expect("move");
    assert!(chain.circular);
    assert_eq!(
        chain.moves(),
        vec![
            TabMove::new(TabId(1), 0),
            TabMove::new(TabId(2), 1),
            TabMove::new(TabId(0), 2),
        ]
    );
    assert_eq!(layout(&db), vec![(0, 2), (1, 0), (2, 1)]);
}

#[test]
fn full_rotation_displaces_every_other_tab() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let n = 12;
    let mut strip = seed_strip(&db, n);
    strip.move_tab(TabId(0), (n - 1) as u32).expect("host move");

    let tabs = TabStore::new(db.conn());
    let cascade = resolve_cascade(&tabs, &strip, (n - 1) as u32, TabId(0)).expect("resolve");
    assert_eq!(cascade.end, CascadeEnd::ReturnedToOrigin);
    assert_eq!(cascade.moves.len(), (n - 1) as usize);

    move_tab(db.conn(), &strip, TabId(0), (n - 1) as u32).expect("move");
    assert_eq!(layout(&db), expected(&strip));
}

#[test]
fn partial_move_only_touches_the_span() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let mut strip = seed_strip(&db, 6);
    strip.move_tab(TabId(4), 1).expect("host move");

    let chain = move_tab(db.conn(), &strip, TabId(4), 1).expect("move");
    assert_eq!(chain.cascade.len(), 3);
    assert!(chain.circular);
    assert_eq!(layout(&db), expected(&strip));
    assert_eq!(layout(&db)[0], (0, 0));
    assert_eq!(layout(&db)[5], (5, 5));
}

#[test]
fn successive_moves_stay_in_step_with_the_host() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let mut strip = seed_strip(&db, 5);

    for (tab, to) in [(0, 4), (3, 0), (2, 2), (4, 1), (1, 3)] {
        let to = strip.move_tab(TabId(tab), to).expect("host move");
        move_tab(db.conn(), &strip, TabId(tab), to).expect("move");
        assert_eq!(layout(&db), expected(&strip), "after moving {tab} to {to}");
    }
}

#[test]
fn move_after_a_close_resolves_against_the_closed_up_strip() {
    let tmp = TempDir::new().expect("tempdir");
    let db = open(&tmp);
    let mut strip = seed_strip(&db, 4);

    let freed = TabStore::new(db.conn()).remove(TabId(0)).expect("remove");
    assert_eq!(freed, strip.close(TabId(0)).expect("host close"));
    assert_eq!(layout(&db), expected(&strip));

    // Strip [1, 2, 3]; 1 dragged to the end rotates the whole strip.
    strip.move_tab(TabId(1), 2).expect("host move");
    let chain = move_tab(db.conn(), &strip, TabId(1), 2).expect("move");
    assert!(chain.circular);
    assert_eq!(chain.cascade.len(), 2);
    assert_eq!(layout(&db), vec![(1, 2), (2, 0), (3, 1)]);
    assert_eq!(layout(&db), expected(&strip));
}
