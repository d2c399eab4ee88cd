//! Single-request edits of a user's bookmark tree.
//!
//! Each operation runs its storage changes in one `BEGIN IMMEDIATE`
//! transaction. The matching search-index write and the change signal are
//! issued after the commit; their failures are logged and never undo the
//! storage change.

use std::collections::HashSet;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::managers::bookmark_store::{BookmarkStoreTrait, SqliteBookmarkStore};
use crate::managers::path_tree;
use crate::services::change_signal::{notify_changed, now_millis, ChangeSignalTrait};
use crate::services::search_index::SearchIndexTrait;
use crate::types::bookmark::{
    BookmarkNode, MoveNodeBody, NewBookmark, NodeKind, SearchDocument, APPEND_SORT,
};
use crate::types::errors::BookmarkError;

pub struct MutationEngine<'a> {
    conn: &'a Connection,
    index: &'a dyn SearchIndexTrait,
    signal: &'a dyn ChangeSignalTrait,
}

impl<'a> MutationEngine<'a> {
    pub fn new(
        conn: &'a Connection,
        index: &'a dyn SearchIndexTrait,
        signal: &'a dyn ChangeSignalTrait,
    ) -> Self {
        Self { conn, index, signal }
    }

    fn begin(&self) -> Result<Transaction<'a>, BookmarkError> {
        Ok(Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?)
    }

    fn index_after_commit(&self, user_id: i64, doc: Option<SearchDocument>) {
        if let Some(doc) = doc {
            if let Err(err) = self.index.upsert_one(&doc) {
                tracing::warn!(user_id, id = doc.id, error = %err, "failed to index bookmark");
            }
        }
    }

    /// Appends a new node after the last sibling at `new.path`.
    ///
    /// Unlike import, an existing sibling with the same name is an error.
    pub fn add_one(&self, user_id: i64, new: &NewBookmark) -> Result<BookmarkNode, BookmarkError> {
        if new.name.trim().is_empty() {
            return Err(BookmarkError::InvalidInput("name must not be empty".to_string()));
        }
        if new.kind == NodeKind::Link && new.url.trim().is_empty() {
            return Err(BookmarkError::InvalidInput("link url must not be empty".to_string()));
        }

        let tx = self.begin()?;
        let store = SqliteBookmarkStore::new(&tx);
        path_tree::ensure_folder_path(&store, user_id, &new.path)?;

        let now = now_millis();
        let mut node = BookmarkNode {
            id: 0,
            user_id,
            kind: new.kind,
            name: new.name.clone(),
            path: new.path.clone(),
            sort: path_tree::next_sibling_sort(&store, user_id, &new.path)?,
            url: new.url.clone(),
            icon: new.icon.clone(),
            add_time: if new.kind == NodeKind::Link { now } else { 0 },
            create_time: now,
        };
        let id = store.insert_one(&node).map_err(|err| match err {
            BookmarkError::Conflict(_) => BookmarkError::Conflict(format!(
                "'{}' already exists at path '{}'",
                node.name, node.path
            )),
            other => other,
        })?;
        node.id = id;
        tx.commit()?;

        self.index_after_commit(user_id, SearchDocument::from_node(&node));
        notify_changed(self.signal, user_id);
        tracing::info!(
            user_id,
            id = node.id,
            path = %node.path,
            sort = node.sort,
            "added bookmark"
        );
        Ok(node)
    }

    /// Overwrites name, url and icon of `node.id`. Returns the number of
    /// rows changed, zero when the id is unknown or owned by someone else.
    pub fn update_one(&self, user_id: i64, node: &BookmarkNode) -> Result<usize, BookmarkError> {
        if node.name.trim().is_empty() {
            return Err(BookmarkError::InvalidInput("name must not be empty".to_string()));
        }

        let tx = self.begin()?;
        let store = SqliteBookmarkStore::new(&tx);
        let affected = store.edit_bookmark(user_id, node)?;
        let doc = if affected > 0 {
            store
                .get_by_id(user_id, node.id)?
                .and_then(|stored| SearchDocument::from_node(&stored))
        } else {
            None
        };
        tx.commit()?;

        self.index_after_commit(user_id, doc);
        notify_changed(self.signal, user_id);
        tracing::debug!(user_id, id = node.id, affected, "updated bookmark");
        Ok(affected)
    }

    /// Deletes the given folders with their subtrees plus the given nodes.
    /// A link id passed as a folder is deleted like any other node.
    ///
    /// Returns the ids removed from storage, which are exactly the ids
    /// removed from the index. Ids the user does not own are ignored.
    pub fn batch_delete(
        &self,
        user_id: i64,
        folder_ids: &[i64],
        bookmark_ids: &[i64],
    ) -> Result<HashSet<i64>, BookmarkError> {
        let tx = self.begin()?;
        let store = SqliteBookmarkStore::new(&tx);

        let mut removed = HashSet::new();
        let mut singles = bookmark_ids.to_vec();
        for &folder_id in folder_ids {
            let descendants = path_tree::descendant_ids(&store, user_id, folder_id)?;
            if store.delete_folder(user_id, folder_id)? > 0 {
                removed.insert(folder_id);
                removed.extend(descendants);
            } else {
                // not a folder of this user; a link id is deleted on its own
                singles.push(folder_id);
            }
        }
        let owned = store.select_owned_ids(user_id, &singles)?;
        store.delete_bookmarks(user_id, &owned)?;
        removed.extend(owned);
        tx.commit()?;

        if let Err(err) = self.index.delete_batch(&removed) {
            tracing::warn!(
                user_id,
                count = removed.len(),
                error = %err,
                "failed to remove deleted bookmarks from index"
            );
        }
        notify_changed(self.signal, user_id);
        tracing::info!(user_id, count = removed.len(), "deleted bookmarks");
        Ok(removed)
    }

    /// Moves one node, and its subtree if it is a folder, to `target_path`
    /// at slot `sort`. [`APPEND_SORT`] appends after the last sibling; any
    /// other slot shifts the siblings at or after it up by one.
    pub fn move_node(
        &self,
        user_id: i64,
        body: &MoveNodeBody,
    ) -> Result<BookmarkNode, BookmarkError> {
        if body.sort < 0 && body.sort != APPEND_SORT {
            return Err(BookmarkError::InvalidInput(format!("invalid sort {}", body.sort)));
        }
        if path_tree::ancestor_ids(&body.target_path).contains(&body.bookmark_id) {
            return Err(BookmarkError::InvalidInput(format!(
                "cannot move {} into its own subtree",
                body.bookmark_id
            )));
        }

        let tx = self.begin()?;
        let store = SqliteBookmarkStore::new(&tx);
        let mut node = store
            .get_by_id(user_id, body.bookmark_id)?
            .ok_or_else(|| BookmarkError::NotFound(format!("bookmark {}", body.bookmark_id)))?;
        if node.path != body.source_path {
            return Err(BookmarkError::InvalidInput(format!(
                "bookmark {} is not at path '{}'",
                body.bookmark_id, body.source_path
            )));
        }
        path_tree::ensure_folder_path(&store, user_id, &body.target_path)?;

        let sort = if body.sort == APPEND_SORT {
            path_tree::next_sibling_sort(&store, user_id, &body.target_path)?
        } else {
            store.sort_plus_from(user_id, &body.target_path, body.sort)?;
            body.sort
        };

        let mut rewritten = 0;
        if body.target_path != body.source_path {
            rewritten = store.update_children_path(
                user_id,
                &path_tree::child_path(node.id, &body.source_path),
                &path_tree::child_path(node.id, &body.target_path),
            )?;
        }
        store.update_path_and_sort(user_id, node.id, &body.target_path, sort)?;
        tx.commit()?;

        notify_changed(self.signal, user_id);
        tracing::info!(
            user_id,
            id = node.id,
            from = %body.source_path,
            to = %body.target_path,
            sort,
            descendants = rewritten,
            "moved bookmark"
        );
        node.path = body.target_path.clone();
        node.sort = sort;
        Ok(node)
    }
}
