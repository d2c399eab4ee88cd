//! Unit tests for the RPC handler: every JSON-RPC method dispatched by `handle_method`.
//!
//! These tests exercise the same code path as the real `bookmark-rpc` binary,
//! using an in-memory database and search index.

use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tempfile::TempDir;

use bookmark_service::app::App;
use bookmark_service::rpc_handler::handle_method;
use bookmark_service::types::config::ServiceConfig;

const EXPORT: &str = r#"<DL><p>
    <DT><H3>Bookmarks bar</H3>
    <DL><p>
        <DT><A HREF="http://example.com" ADD_DATE="1700000000">Example</A>
        <DT><H3>Work</H3>
        <DL><p><DT><A HREF="https://jira.example.com">Jira</A></DL><p>
    </DL><p>
</DL>"#;

fn setup() -> Mutex<App> {
    Mutex::new(App::in_memory().expect("Failed to init App"))
}

fn call(app: &Mutex<App>, method: &str, params: Value) -> Value {
    handle_method(app, method, &params).unwrap_or_else(|e| panic!("{} failed: {}", method, e))
}

fn id_of(tree: &Value, path: &str, name: &str) -> i64 {
    tree[path]
        .as_array()
        .and_then(|nodes| nodes.iter().find(|n| n["name"] == name))
        .and_then(|n| n["id"].as_i64())
        .unwrap_or_else(|| panic!("no '{}' at path '{}'", name, path))
}

// ─── Dispatch ───

#[test]
fn test_unknown_method_returns_error() {
    let app = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({}));
    assert!(res.unwrap_err().contains("unknown method"));
}

#[test]
fn test_missing_user_id_is_rejected() {
    let app = setup();
    let res = handle_method(&app, "bookmark.tree", &json!({}));
    assert_eq!(res.unwrap_err(), "missing user_id");
}

// ─── Import ───

#[test]
fn test_import_from_content_then_tree() {
    let app = setup();
    let summary = call(&app, "bookmark.import", json!({"user_id": 1, "content": EXPORT}));
    assert_eq!(summary, json!({"folders_created": 1, "links_created": 2, "reused": 0}));

    let tree = call(&app, "bookmark.tree", json!({"user_id": 1}));
    let root = tree[""].as_array().unwrap();
    let names: Vec<&str> = root.iter().filter_map(|n| n["name"].as_str()).collect();
    assert_eq!(names, vec!["Example", "Work"]);

    let work = id_of(&tree, "", "Work");
    assert_eq!(tree[work.to_string()][0]["name"], "Jira");
    assert_eq!(tree[work.to_string()][0]["kind"], "link");
}

#[test]
fn test_import_from_base64_and_file() {
    let app = setup();
    let encoded = BASE64.encode(EXPORT);
    let first = call(&app, "bookmark.import", json!({"user_id": 1, "content_base64": encoded}));
    assert_eq!(first["links_created"], 2);

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bookmarks.html");
    std::fs::write(&file, EXPORT).unwrap();
    let second = call(&app, "bookmark.import", json!({"user_id": 1, "file": file.to_string_lossy()}));
    assert_eq!(second["reused"], 3);
}

#[test]
fn test_import_without_source_is_rejected() {
    let app = setup();
    let res = handle_method(&app, "bookmark.import", &json!({"user_id": 1}));
    assert!(res.unwrap_err().contains("missing file"));
    let res = handle_method(&app, "bookmark.import", &json!({"user_id": 1, "content_base64": "***"}));
    assert!(res.unwrap_err().contains("base64"));
}

// ─── Add / update / list / search ───

#[test]
fn test_add_list_update_search() {
    let app = setup();
    let folder = call(&app, "bookmark.add", json!({"user_id": 5, "kind": "folder", "name": "Reading"}));
    let folder_path = folder["id"].as_i64().unwrap().to_string();
    let link = call(
        &app,
        "bookmark.add",
        json!({"user_id": 5, "kind": "link", "name": "Rust blog", "path": folder_path, "url": "https://blog.rust-lang.org"}),
    );
    assert_eq!(link["sort"], 1);

    let listed = call(&app, "bookmark.list", json!({"user_id": 5, "path": folder_path}));
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let hits = call(&app, "bookmark.search", json!({"user_id": 5, "query": "rust"}));
    assert_eq!(hits[0]["id"], link["id"]);

    let updated = call(
        &app,
        "bookmark.update",
        json!({"user_id": 5, "id": link["id"], "name": "Inside Rust", "url": "https://blog.rust-lang.org/inside-rust"}),
    );
    assert_eq!(updated, json!({"updated": 1}));
    let hits = call(&app, "bookmark.search", json!({"user_id": 5, "query": "inside"}));
    assert_eq!(hits[0]["name"], "Inside Rust");

    // other users see nothing
    let foreign = call(&app, "bookmark.search", json!({"user_id": 6, "query": "rust"}));
    assert_eq!(foreign, json!([]));
}

#[test]
fn test_get_returns_node_or_null() {
    let app = setup();
    let added = call(
        &app,
        "bookmark.add",
        json!({"user_id": 4, "kind": "link", "name": "Docs", "url": "https://docs.rs"}),
    );
    let fetched = call(&app, "bookmark.get", json!({"user_id": 4, "id": added["id"]}));
    assert_eq!(fetched, added);

    let foreign = call(&app, "bookmark.get", json!({"user_id": 9, "id": added["id"]}));
    assert_eq!(foreign, Value::Null);
    assert!(handle_method(&app, "bookmark.get", &json!({"user_id": 4})).is_err());
}

#[test]
fn test_add_duplicate_reports_conflict() {
    let app = setup();
    call(&app, "bookmark.add", json!({"user_id": 1, "kind": "folder", "name": "Dup"}));
    let res = handle_method(&app, "bookmark.add", &json!({"user_id": 1, "kind": "folder", "name": "Dup"}));
    assert!(res.unwrap_err().starts_with("Bookmark conflict"));
}

#[test]
fn test_search_results_are_capped() {
    let app = setup();
    for i in 0..8 {
        call(
            &app,
            "bookmark.add",
            json!({"user_id": 1, "kind": "link", "name": format!("docs {}", i), "url": format!("https://docs{}.example", i)}),
        );
    }
    let hits = call(&app, "bookmark.search", json!({"user_id": 1, "query": "docs"}));
    assert_eq!(hits.as_array().unwrap().len(), 5);
}

// ─── Move / delete / sync ───

#[test]
fn test_move_then_delete() {
    let app = setup();
    call(&app, "bookmark.import", json!({"user_id": 2, "content": EXPORT}));
    let tree = call(&app, "bookmark.tree", json!({"user_id": 2}));
    let work = id_of(&tree, "", "Work");
    let example = id_of(&tree, "", "Example");

    let moved = call(
        &app,
        "bookmark.move",
        json!({"user_id": 2, "bookmark_id": example, "source_path": "", "target_path": work.to_string(), "sort": -1}),
    );
    assert_eq!(moved["path"], work.to_string());
    assert_eq!(moved["sort"], 2);

    let deleted = call(&app, "bookmark.delete", json!({"user_id": 2, "folder_ids": [work]}));
    assert_eq!(deleted["deleted"].as_array().unwrap().len(), 3);

    let tree = call(&app, "bookmark.tree", json!({"user_id": 2}));
    assert_eq!(tree, json!({}));
    let hits = call(&app, "bookmark.search", json!({"user_id": 2, "query": "example jira"}));
    assert_eq!(hits, json!([]));
}

#[test]
fn test_delete_rejects_non_integer_ids() {
    let app = setup();
    let res = handle_method(&app, "bookmark.delete", &json!({"user_id": 1, "bookmark_ids": ["x"]}));
    assert!(res.is_err());
}

#[test]
fn test_sync_reports_indexed_count() {
    let app = setup();
    call(&app, "bookmark.import", json!({"user_id": 3, "content": EXPORT}));
    let res = call(&app, "bookmark.sync", json!({"user_id": 3}));
    assert_eq!(res, json!({"indexed": 2}));
}

/// The on-disk App resolves its storage from the config.
#[test]
fn test_app_on_disk_from_config() {
    let dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        database_path: Some(dir.path().join("data/bookmarks.db").to_string_lossy().to_string()),
        index_path: Some(dir.path().join("data/index").to_string_lossy().to_string()),
        ..ServiceConfig::default()
    };
    let app = Mutex::new(App::new(config).expect("Failed to init App"));
    call(&app, "bookmark.import", json!({"user_id": 1, "content": EXPORT}));
    assert!(dir.path().join("data/bookmarks.db").exists());
    assert_eq!(call(&app, "bookmark.search", json!({"user_id": 1, "query": "jira"})).as_array().unwrap().len(), 1);
}
