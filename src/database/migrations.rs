//! Schema migrations for the bookmark database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Safe to call on every startup.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    // journal_mode returns a row, so it cannot go through execute_batch
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Bookmark tree with materialized paths")?;
    }

    if current < 2 {
        migration_v2(conn)?;
        record_version(conn, 2, "Per-user bookmark update log")?;
    }

    Ok(())
}

fn record_version(
    conn: &Connection,
    version: i32,
    description: &str,
) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: the bookmark tree.
///
/// `(user_id, path, name)` is unique per sibling group, and so is
/// `(user_id, path, sort)`; concurrent writers racing for a slot get a
/// constraint violation instead of a silently duplicated position.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS bookmark (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            type INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL,
            path TEXT NOT NULL DEFAULT '',
            sort INTEGER NOT NULL DEFAULT 0,
            url TEXT NOT NULL DEFAULT '',
            icon TEXT NOT NULL DEFAULT '',
            add_time INTEGER NOT NULL DEFAULT 0,
            create_time INTEGER NOT NULL,
            UNIQUE(user_id, path, name)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_bookmark_sibling_sort ON bookmark(user_id, path, sort);
        CREATE INDEX IF NOT EXISTS idx_bookmark_user_type ON bookmark(user_id, type, id);
        ",
    )
}

/// V2: append-only change signals consumed by cache invalidation.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS bookmark_update_log (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            update_time INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_update_log_user ON bookmark_update_log(user_id);
        ",
    )
}
