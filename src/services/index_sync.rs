//! Full rebuild of one user's search documents from storage.

use rusqlite::Connection;

use crate::managers::bookmark_store::{BookmarkStoreTrait, SqliteBookmarkStore};
use crate::services::search_index::SearchIndexTrait;
use crate::types::bookmark::{NodeKind, SearchDocument};
use crate::types::config::DEFAULT_SYNC_PAGE_SIZE;
use crate::types::errors::BookmarkError;

pub struct IndexSyncEngine<'a> {
    conn: &'a Connection,
    index: &'a dyn SearchIndexTrait,
    page_size: i64,
}

impl<'a> IndexSyncEngine<'a> {
    pub fn new(conn: &'a Connection, index: &'a dyn SearchIndexTrait) -> Self {
        Self::with_page_size(conn, index, DEFAULT_SYNC_PAGE_SIZE)
    }

    pub fn with_page_size(
        conn: &'a Connection,
        index: &'a dyn SearchIndexTrait,
        page_size: i64,
    ) -> Self {
        Self {
            conn,
            index,
            page_size: page_size.max(1),
        }
    }

    /// Drops every index document of the user and re-adds one per stored
    /// link, reading storage page by page. Returns the number of documents
    /// written.
    ///
    /// Safe to re-run at any time. A concurrent mutation may or may not be
    /// reflected, but its own post-commit index write still lands.
    pub fn sync_user_bookmark(&self, user_id: i64) -> Result<usize, BookmarkError> {
        let store = SqliteBookmarkStore::new(self.conn);
        self.index.delete_by_user(user_id)?;

        let mut offset = 0;
        let mut written = 0;
        loop {
            let page = store.select_page(user_id, NodeKind::Link, offset, self.page_size)?;
            let docs: Vec<SearchDocument> =
                page.iter().filter_map(SearchDocument::from_node).collect();
            self.index.upsert_batch(&docs)?;
            written += docs.len();
            tracing::debug!(user_id, offset, count = page.len(), "synced index page");

            if (page.len() as i64) < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        tracing::info!(user_id, documents = written, "rebuilt search index");
        Ok(written)
    }
}
