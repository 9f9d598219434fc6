//! Database schema definitions for the tabgraph store.
//!
//! A single SQLite database holds both logical tables:
//! 1. `visits` + `visit_children`: the navigation graph (append-mostly).
//! 2. `tabs`: one row per live tab, unique on `tab_position` while consistent.

pub const DB_NAME: &str = "tabgraph.db";
pub const CONFIG_NAME: &str = "tabgraph.toml";
pub const AUDIT_LOG_NAME: &str = "broker.events.jsonl";

pub const SCHEMA_VERSION: u32 = 1;

pub const DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const DB_SCHEMA_VISITS: &str = "
    CREATE TABLE IF NOT EXISTS visits (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        icon TEXT,
        creation_cause TEXT NOT NULL,
        parent_id TEXT,
        replaced_parent INTEGER,
        created_at INTEGER NOT NULL,
        end_cause TEXT,
        ended_at INTEGER,
        FOREIGN KEY(parent_id) REFERENCES visits(id)
    )
";

// `seq` preserves append order of children; `child_id` is unique so a visit
// hangs below at most one parent.
pub const DB_SCHEMA_VISIT_CHILDREN: &str = "
    CREATE TABLE IF NOT EXISTS visit_children (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        parent_id TEXT NOT NULL,
        child_id TEXT NOT NULL UNIQUE,
        FOREIGN KEY(parent_id) REFERENCES visits(id),
        FOREIGN KEY(child_id) REFERENCES visits(id)
    )
";
pub const DB_SCHEMA_INDEX_VISIT_CHILDREN_PARENT: &str =
    "CREATE INDEX IF NOT EXISTS idx_visit_children_parent ON visit_children(parent_id, seq)";

// Visit references on tabs are not foreign keys; `check` reports dangling ones.
pub const DB_SCHEMA_TABS: &str = "
    CREATE TABLE IF NOT EXISTS tabs (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        tab_id INTEGER NOT NULL UNIQUE,
        current_visit TEXT,
        created_by_visit TEXT,
        tab_position INTEGER NOT NULL CHECK (tab_position >= 0)
    )
";
pub const DB_SCHEMA_INDEX_TABS_POSITION: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_tabs_position ON tabs(tab_position)";
