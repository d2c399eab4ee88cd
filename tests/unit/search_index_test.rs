//! Unit tests for the tantivy-backed search index.

use std::collections::HashSet;

use bookmark_service::services::search_index::{SearchIndex, SearchIndexTrait};
use bookmark_service::types::bookmark::SearchDocument;
use tempfile::TempDir;

fn doc(id: i64, user_id: i64, name: &str, url: &str) -> SearchDocument {
    SearchDocument {
        id,
        user_id,
        name: name.to_string(),
        url: url.to_string(),
    }
}

fn ids(hits: &[SearchDocument]) -> HashSet<i64> {
    hits.iter().map(|d| d.id).collect()
}

fn setup() -> SearchIndex {
    let index = SearchIndex::in_memory().expect("Failed to create in-memory index");
    index
        .upsert_batch(&[
            doc(1, 10, "Rust Programming Language", "https://www.rust-lang.org"),
            doc(2, 10, "Tokio tutorial", "https://tokio.rs/tokio/tutorial"),
            doc(3, 10, "Cooking pasta", "https://recipes.example/pasta"),
            doc(4, 20, "Rust by Example", "https://doc.rust-lang.org/rust-by-example"),
        ])
        .unwrap();
    index
}

#[test]
fn test_search_matches_name_and_url() {
    let index = setup();

    let by_name = index.search(10, "programming", 5).unwrap();
    assert_eq!(ids(&by_name), HashSet::from([1]));

    let by_url = index.search(10, "recipes", 5).unwrap();
    assert_eq!(ids(&by_url), HashSet::from([3]));
    assert_eq!(by_url[0].url, "https://recipes.example/pasta");
}

/// Results never include another user's documents.
#[test]
fn test_search_is_filtered_by_user() {
    let index = setup();
    assert_eq!(ids(&index.search(10, "rust", 5).unwrap()), HashSet::from([1]));
    assert_eq!(ids(&index.search(20, "rust", 5).unwrap()), HashSet::from([4]));
    assert!(index.search(30, "rust", 5).unwrap().is_empty());
}

#[test]
fn test_search_is_case_insensitive_and_ors_terms() {
    let index = setup();
    let hits = index.search(10, "TOKIO Pasta", 5).unwrap();
    assert_eq!(ids(&hits), HashSet::from([2, 3]));
}

#[test]
fn test_search_respects_limit() {
    let index = SearchIndex::in_memory().unwrap();
    let docs: Vec<SearchDocument> = (1..=12)
        .map(|i| doc(i, 10, &format!("news site {}", i), &format!("https://news{}.example", i)))
        .collect();
    index.upsert_batch(&docs).unwrap();

    assert_eq!(index.search(10, "news", 5).unwrap().len(), 5);
    assert_eq!(index.search(10, "news", 50).unwrap().len(), 12);
    assert!(index.search(10, "news", 0).unwrap().is_empty());
}

#[test]
fn test_blank_query_returns_nothing() {
    let index = setup();
    assert!(index.search(10, "   ", 5).unwrap().is_empty());
    assert!(index.search(10, "://", 5).unwrap().is_empty());
}

#[test]
fn test_upsert_replaces_document_with_same_id() {
    let index = setup();
    index.upsert_one(&doc(2, 10, "Async runtime", "https://tokio.rs")).unwrap();

    assert!(index.search(10, "tutorial", 5).unwrap().is_empty());
    let hits = index.search(10, "async", 5).unwrap();
    assert_eq!(hits, vec![doc(2, 10, "Async runtime", "https://tokio.rs")]);
}

#[test]
fn test_delete_batch_removes_only_given_ids() {
    let index = setup();
    index.delete_batch(&HashSet::from([1, 2])).unwrap();

    assert!(index.search(10, "rust tokio", 5).unwrap().is_empty());
    assert_eq!(ids(&index.search(10, "pasta", 5).unwrap()), HashSet::from([3]));
}

#[test]
fn test_delete_batch_with_empty_set_is_noop() {
    let index = setup();
    index.delete_batch(&HashSet::new()).unwrap();
    assert_eq!(index.search(10, "rust", 5).unwrap().len(), 1);
}

#[test]
fn test_delete_by_user_leaves_other_users() {
    let index = setup();
    index.delete_by_user(10).unwrap();

    assert!(index.search(10, "rust tokio pasta", 5).unwrap().is_empty());
    assert_eq!(ids(&index.search(20, "rust", 5).unwrap()), HashSet::from([4]));
}

#[test]
fn test_on_disk_index_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("search-index");

    {
        let index = SearchIndex::open(&path, 15_000_000).unwrap();
        index.upsert_one(&doc(7, 1, "Persistent", "https://disk.example")).unwrap();
    }

    let reopened = SearchIndex::open(&path, 15_000_000).unwrap();
    let hits = reopened.search(1, "persistent", 5).unwrap();
    assert_eq!(ids(&hits), HashSet::from([7]));
}
