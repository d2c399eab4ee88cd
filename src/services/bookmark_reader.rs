//! Read-only views of a user's bookmarks: the tree, one folder, search.

use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::managers::bookmark_store::{BookmarkStoreTrait, SqliteBookmarkStore};
use crate::managers::path_tree;
use crate::services::search_index::SearchIndexTrait;
use crate::types::bookmark::{BookmarkNode, SearchDocument};
use crate::types::config::DEFAULT_SEARCH_LIMIT;
use crate::types::errors::BookmarkError;

pub struct BookmarkReader<'a> {
    store: SqliteBookmarkStore<'a>,
    index: &'a dyn SearchIndexTrait,
    search_limit: usize,
}

impl<'a> BookmarkReader<'a> {
    pub fn new(conn: &'a Connection, index: &'a dyn SearchIndexTrait) -> Self {
        Self {
            store: SqliteBookmarkStore::new(conn),
            index,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Every node of the user keyed by path, each group ordered by sort.
    pub fn get_tree(
        &self,
        user_id: i64,
    ) -> Result<BTreeMap<String, Vec<BookmarkNode>>, BookmarkError> {
        Ok(path_tree::group_by_path(self.store.get_list_by_user_id(user_id)?))
    }

    pub fn list_by_path(
        &self,
        user_id: i64,
        path: &str,
    ) -> Result<Vec<BookmarkNode>, BookmarkError> {
        self.store.get_list_by_user_id_and_path(user_id, path)
    }

    pub fn get_node(&self, user_id: i64, id: i64) -> Result<Option<BookmarkNode>, BookmarkError> {
        self.store.get_by_id(user_id, id)
    }

    /// Links of the user whose name or url matches `text`, best first.
    pub fn search_user_bookmark(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<Vec<SearchDocument>, BookmarkError> {
        self.index.search(user_id, text, self.search_limit)
    }
}
