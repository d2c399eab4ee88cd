//! Unit tests for IndexSyncEngine: a full rebuild restores exactly one
//! document per stored link, however many pages it takes.

use rstest::rstest;

use bookmark_service::database::Database;
use bookmark_service::managers::bookmark_store::{BookmarkStoreTrait, SqliteBookmarkStore};
use bookmark_service::services::index_sync::IndexSyncEngine;
use bookmark_service::services::search_index::{SearchIndex, SearchIndexTrait};
use bookmark_service::types::bookmark::{BookmarkNode, NodeKind, SearchDocument};

const USER: i64 = 11;
const OTHER_USER: i64 = 12;

fn setup() -> (Database, SearchIndex) {
    (
        Database::open_in_memory().expect("Failed to open in-memory database"),
        SearchIndex::in_memory().expect("Failed to create in-memory index"),
    )
}

/// Inserts `count` links (all named "entry N") plus one folder for `user_id`.
fn seed(db: &Database, user_id: i64, count: i32) -> Vec<i64> {
    let store = SqliteBookmarkStore::new(db.connection());
    store
        .insert_one(&BookmarkNode {
            id: 0,
            user_id,
            kind: NodeKind::Folder,
            name: "entry folder".to_string(),
            path: String::new(),
            sort: 0,
            url: String::new(),
            icon: String::new(),
            add_time: 0,
            create_time: 0,
        })
        .unwrap();
    (1..=count)
        .map(|i| {
            store
                .insert_one(&BookmarkNode {
                    id: 0,
                    user_id,
                    kind: NodeKind::Link,
                    name: format!("entry {}", i),
                    path: String::new(),
                    sort: i,
                    url: format!("https://site{}.example", i),
                    icon: String::new(),
                    add_time: 0,
                    create_time: 0,
                })
                .unwrap()
        })
        .collect()
}

fn indexed_ids(index: &SearchIndex, user_id: i64) -> Vec<i64> {
    let mut ids: Vec<i64> = index
        .search(user_id, "entry", 100_000)
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    ids.sort_unstable();
    ids
}

#[test]
fn test_sync_rebuilds_from_empty_index() {
    let (db, index) = setup();
    let links = seed(&db, USER, 4);

    let written = IndexSyncEngine::new(db.connection(), &index).sync_user_bookmark(USER).unwrap();
    assert_eq!(written, 4);
    assert_eq!(indexed_ids(&index, USER), links);
}

/// Stale and missing documents are both repaired.
#[test]
fn test_sync_repairs_drift() {
    let (db, index) = setup();
    let links = seed(&db, USER, 3);
    index
        .upsert_batch(&[
            SearchDocument {
                id: 9_999,
                user_id: USER,
                name: "entry ghost".to_string(),
                url: "https://ghost.example".to_string(),
            },
            SearchDocument {
                id: links[0],
                user_id: USER,
                name: "entry outdated".to_string(),
                url: "https://old.example".to_string(),
            },
        ])
        .unwrap();

    IndexSyncEngine::new(db.connection(), &index).sync_user_bookmark(USER).unwrap();

    assert_eq!(indexed_ids(&index, USER), links);
    assert!(index.search(USER, "ghost outdated", 5).unwrap().is_empty());
}

/// Page boundaries (short last page, exactly full last page, single page)
/// never drop or duplicate a document.
#[rstest]
#[case(7, 3)]
#[case(6, 3)]
#[case(2, 500)]
#[case(0, 4)]
fn test_sync_is_complete_across_pages(#[case] links: i32, #[case] page_size: i64) {
    let (db, index) = setup();
    let expected = seed(&db, USER, links);

    let written = IndexSyncEngine::with_page_size(db.connection(), &index, page_size)
        .sync_user_bookmark(USER)
        .unwrap();
    assert_eq!(written, expected.len());
    assert_eq!(indexed_ids(&index, USER), expected);
}

#[test]
fn test_sync_with_default_page_size_spans_several_pages() {
    let (db, index) = setup();
    let expected = seed(&db, USER, 1_100);

    let written = IndexSyncEngine::new(db.connection(), &index).sync_user_bookmark(USER).unwrap();
    assert_eq!(written, 1_100);
    assert_eq!(indexed_ids(&index, USER), expected);
}

#[test]
fn test_sync_leaves_other_users_alone() {
    let (db, index) = setup();
    seed(&db, USER, 2);
    let theirs = seed(&db, OTHER_USER, 2);
    IndexSyncEngine::new(db.connection(), &index).sync_user_bookmark(OTHER_USER).unwrap();

    IndexSyncEngine::new(db.connection(), &index).sync_user_bookmark(USER).unwrap();
    assert_eq!(indexed_ids(&index, OTHER_USER), theirs);
    assert_eq!(indexed_ids(&index, USER).len(), 2);
}

#[test]
fn test_sync_is_repeatable() {
    let (db, index) = setup();
    let expected = seed(&db, USER, 5);
    let engine = IndexSyncEngine::with_page_size(db.connection(), &index, 2);

    engine.sync_user_bookmark(USER).unwrap();
    engine.sync_user_bookmark(USER).unwrap();
    assert_eq!(indexed_ids(&index, USER), expected);
}
