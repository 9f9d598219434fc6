use crate::core::error::TabGraphError;
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub fn db_connect(db_path: &Path, busy_timeout: Duration) -> Result<Connection, TabGraphError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

/// Storage handle shared by the visit and tab stores.
///
/// Opened once at startup and passed by reference; there is no process-wide
/// lazily opened connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self, TabGraphError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = db_connect(db_path, busy_timeout)?;
        ensure_schema(&conn)?;
        debug!(path = %db_path.display(), "database opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, TabGraphError> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys=ON;", [])?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Run `f` inside a transaction and commit on success.
///
/// When `conn` is already inside a transaction, `f` runs in it and the
/// outermost caller decides whether everything commits.
pub fn with_tx<F, R>(conn: &Connection, f: F) -> Result<R, TabGraphError>
where
    F: FnOnce(&Connection) -> Result<R, TabGraphError>,
{
    if !conn.is_autocommit() {
        return f(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let out = f(&*tx)?;
    tx.commit()?;
    Ok(out)
}

fn ensure_schema(conn: &Connection) -> Result<(), TabGraphError> {
    conn.execute(schemas::DB_SCHEMA_META, [])?;

    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let current_version: u32 = current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    if current_version >= schemas::SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute(schemas::DB_SCHEMA_VISITS, [])?;
    conn.execute(schemas::DB_SCHEMA_VISIT_CHILDREN, [])?;
    conn.execute(schemas::DB_SCHEMA_INDEX_VISIT_CHILDREN_PARENT, [])?;
    conn.execute(schemas::DB_SCHEMA_TABS, [])?;
    conn.execute(schemas::DB_SCHEMA_INDEX_TABS_POSITION, [])?;

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [schemas::SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
