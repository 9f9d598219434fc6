use tabgraph::core::broker::{self, Broker};
use tabgraph::core::store::Store;
use tabgraph::history::integrity::check_integrity;
use tabgraph::history::tabs::TabStore;
use tabgraph::history::visits::VisitStore;
use tabgraph::history::{
    CreationCause, EndCause, Page, RealTab, TabId, TabStrip, TabTracker, VisitId,
};
use tempfile::TempDir;

fn tracker(store: &Store) -> TabTracker<TabStrip> {
    TabTracker::new(
        store.open_database().expect("open db"),
        Broker::new(&store.audit_log_path()),
        TabStrip::new(),
    )
}

fn current(t: &TabTracker<TabStrip>, tab: i64) -> VisitId {
    TabStore::new(t.database().conn())
        .require(TabId(tab))
        .expect("tab record")
        .current_visit
        .expect("current visit")
}

#[test]
fn typed_url_in_new_tab_is_a_manual_root() {
    let tmp = TempDir::new().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    let t = tracker(&store);

    t.create_tab(TabId(1), None, 0).expect("create");
    t.navigate_to(TabId(1), Page::new("Example", "https://example.com"))
        .expect("navigate");

    let visit = VisitStore::new(t.database().conn())
        .require_visit(&current(&t, 1))
        .expect("visit");
    assert_eq!(visit.creation.cause, CreationCause::Manual);
    assert_eq!(visit.creation.parent_id, None);
    assert!(visit.is_open());
}

#[test]
fn browsing_session_builds_a_forest() {
    let tmp = TempDir::new().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    let t = tracker(&store);

    t.create_tab(TabId(1), None, 0).expect("create 1");
    t.navigate_to(TabId(1), Page::new("A", "https://a.com")).expect("nav a");
    let a = current(&t, 1);
    t.navigate_to(TabId(1), Page::new("B", "https://b.com")).expect("nav b");
    let b = current(&t, 1);

    // Link opened from B into a new tab.
    t.create_tab(TabId(2), Some(TabId(1)), 1).expect("create 2");
    t.navigate_to(TabId(2), Page::new("C", "https://c.com")).expect("nav c");
    let c = current(&t, 2);

    let visits = VisitStore::new(t.database().conn());
    assert_eq!(visits.lineage(&c).expect("lineage"), vec![a.clone(), b.clone(), c.clone()]);

    let a_visit = visits.require_visit(&a).expect("a");
    assert_eq!(a_visit.end.map(|e| e.cause), Some(EndCause::Navigation));
    let b_visit = visits.require_visit(&b).expect("b");
    assert!(b_visit.is_open(), "opening a link in a new tab leaves B open");
    assert_eq!(b_visit.children, vec![c]);

    let report = check_integrity(t.database().conn()).expect("check");
    assert!(report.is_clean(), "{:?}", report.violations);
    assert_eq!(report.visits, 3);
}

#[test]
fn closing_a_tab_ends_its_visit_before_the_record_goes() {
    let tmp = TempDir::new().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    let t = tracker(&store);

    t.create_tab(TabId(1), None, 0).expect("create");
    t.navigate_to(TabId(1), Page::new("A", "https://a.com")).expect("nav");
    let visit = current(&t, 1);
    t.close_tab(TabId(1)).expect("close");

    let conn = t.database().conn();
    assert!(TabStore::new(conn).get(TabId(1)).expect("get").is_none());
    let ended = VisitStore::new(conn).require_visit(&visit).expect("visit");
    assert_eq!(ended.end.map(|e| e.cause), Some(EndCause::Manual));

    // Closing again is a no-op, not an error.
    t.close_tab(TabId(1)).expect("second close");
}

#[test]
fn tab_appended_after_a_close_is_tracked() {
    let tmp = TempDir::new().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    let t = tracker(&store);

    for (id, position) in [(1, 0), (2, 1), (3, 2)] {
        t.create_tab(TabId(id), None, position).expect("create");
    }
    t.close_tab(TabId(1)).expect("close");

    // The strip is [2, 3] now, so the next append lands at 2.
    t.create_tab(TabId(4), None, 2).expect("append after close");
    t.navigate_to(TabId(4), Page::new("D", "https://d.com")).expect("nav");

    let tabs = TabStore::new(t.database().conn());
    let mut layout: Vec<(i64, u32)> = tabs
        .get_all()
        .expect("get_all")
        .into_iter()
        .map(|r| (r.tab_id.0, r.tab_position))
        .collect();
    layout.sort();
    assert_eq!(layout, vec![(2, 0), (3, 1), (4, 2)]);

    let visit = VisitStore::new(t.database().conn())
        .require_visit(&current(&t, 4))
        .expect("visit");
    assert_eq!(visit.page.url, "https://d.com");
}

#[test]
fn every_mutation_lands_in_the_journal() {
    let tmp = TempDir::new().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    let t = tracker(&store);

    t.import_session(&[]).expect("import");
    t.create_tab(TabId(1), None, 0).expect("create");
    assert!(t.create_tab(TabId(1), None, 1).is_err());
    t.close_tab(TabId(1)).expect("close");

    let events = broker::read_journal(&store.audit_log_path()).expect("journal");
    let ops: Vec<(&str, &str)> = events
        .iter()
        .map(|e| (e.op.as_str(), e.status.as_str()))
        .collect();
    assert_eq!(
        ops,
        vec![
            ("session.import", "success"),
            ("tab.create", "success"),
            ("tab.create", "error"),
            ("tab.close", "success"),
        ]
    );
    assert_eq!(events[2].subject.as_deref(), Some("1"));
    assert!(events[2].error.is_some());
}

#[test]
fn history_carries_over_a_restart() {
    let tmp = TempDir::new().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    let before = {
        let t = tracker(&store);
        t.create_tab(TabId(1), None, 0).expect("create");
        t.navigate_to(TabId(1), Page::new("A", "https://a.com")).expect("nav");
        current(&t, 1)
    };

    // The host comes back with new ids; tab 50 holds the same page.
    let t = tracker(&store);
    let summary = t
        .import_session(&[
            RealTab {
                tab_id: TabId(50),
                opener_tab_id: None,
                position: 0,
                page: Some(Page::new("A", "https://a.com")),
            },
            RealTab {
                tab_id: TabId(51),
                opener_tab_id: None,
                position: 1,
                page: Some(Page::new("N", "https://new.com")),
            },
        ])
        .expect("import");
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.imported, vec![TabId(51)]);
    assert_eq!(current(&t, 50), before);

    t.navigate_to(TabId(50), Page::new("B", "https://b.com")).expect("nav");
    let after = VisitStore::new(t.database().conn())
        .require_visit(&current(&t, 50))
        .expect("visit");
    assert_eq!(after.creation.parent_id, Some(before));
}
