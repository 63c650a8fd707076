//! Database schema and migrations.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::StoreError;

/// Database schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

/// Open (or create) the store database at the given path.
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)
        .map_err(|e| StoreError::Open(format!("{}: {}", path.display(), e)))?;
    init(conn)
}

/// Open an in-memory store database (tests, ephemeral hosts).
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory().map_err(|e| StoreError::Open(e.to_string()))?;
    init(conn)
}

fn init(conn: Connection) -> Result<Connection, StoreError> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get::<_, i32>(0).map(|count| count > 0),
        )
        .unwrap_or(false);

    let version: i32 = if table_exists {
        conn.query_row(
            "SELECT version FROM schema_version ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0)
    } else {
        0
    };

    if version < SCHEMA_VERSION {
        migrate(&conn, version)?;
    }

    Ok(conn)
}

/// Run database migrations.
fn migrate(conn: &Connection, from_version: i32) -> Result<(), StoreError> {
    if from_version < 1 {
        create_schema_v1(conn)?;
    }

    Ok(())
}

/// Create initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version INTEGER NOT NULL,
            applied_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stores (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        );

        -- Entry order is insertion order: the AUTOINCREMENT id is the
        -- eviction order, and a replacing write updates in place so the
        -- original id (and therefore eviction position) is kept.
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            store TEXT NOT NULL REFERENCES stores(name) ON DELETE CASCADE,
            key TEXT NOT NULL,
            status INTEGER NOT NULL,
            headers TEXT NOT NULL,
            body BLOB NOT NULL,
            inserted_at INTEGER NOT NULL,
            UNIQUE(store, key)
        );

        CREATE INDEX IF NOT EXISTS idx_entries_store ON entries(store);
        "#,
    )?;

    conn.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
        params![SCHEMA_VERSION, Utc::now().timestamp()],
    )?;

    Ok(())
}
