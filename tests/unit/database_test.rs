//! Unit tests for the bookmark database layer (connection + migrations).

use bookmark_service::database::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use bookmark_service::database::Database;
use tempfile::TempDir;

fn exists(db: &Database, kind: &str, name: &str) -> bool {
    db.connection()
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = ?1 AND name = ?2",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap_or(false)
}

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_tables_and_indexes() {
    let db = Database::open_in_memory().expect("open_in_memory failed");

    for table in ["bookmark", "bookmark_update_log", "schema_version"] {
        assert!(exists(&db, "table", table), "Table '{}' should exist after migrations", table);
    }
    for index in ["idx_bookmark_sibling_sort", "idx_bookmark_user_type", "idx_update_log_user"] {
        assert!(exists(&db, "index", index), "Index '{}' should exist after migrations", index);
    }
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let result = bookmark_service::database::migrations::run_all(db.connection());
    assert!(result.is_ok(), "Running migrations twice should succeed (idempotent)");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_open_file_database_persists() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("bookmarks.db");

    {
        let db = Database::open(&db_path).expect("open with file path should succeed");
        db.connection()
            .execute(
                "INSERT INTO bookmark (user_id, type, name, path, sort, create_time) VALUES (1, 1, 'Work', '', 1, 0)",
                [],
            )
            .unwrap();
    }
    assert!(db_path.exists(), "Database file should exist on disk");

    let reopened = Database::open(&db_path).unwrap();
    let count: i64 = reopened
        .connection()
        .query_row("SELECT COUNT(*) FROM bookmark", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

/// Two siblings may not share a sort slot, but the same slot is free in
/// another folder or for another user.
#[test]
fn test_sibling_sort_is_unique_per_group() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    let insert = "INSERT INTO bookmark (user_id, type, name, path, sort, create_time) VALUES (?1, 0, ?2, ?3, ?4, 0)";

    conn.execute(insert, rusqlite::params![1, "a", "", 1]).unwrap();
    conn.execute(insert, rusqlite::params![1, "b", "5", 1]).unwrap();
    conn.execute(insert, rusqlite::params![2, "c", "", 1]).unwrap();
    assert!(conn.execute(insert, rusqlite::params![1, "d", "", 1]).is_err());
}

#[test]
fn test_sibling_name_is_unique_per_group() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    let insert = "INSERT INTO bookmark (user_id, type, name, path, sort, create_time) VALUES (1, 0, 'Rust', ?1, ?2, 0)";

    conn.execute(insert, rusqlite::params!["", 1]).unwrap();
    conn.execute(insert, rusqlite::params!["9", 1]).unwrap();
    assert!(conn.execute(insert, rusqlite::params!["", 2]).is_err());
}
