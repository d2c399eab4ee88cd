//! Bookmark-file import.
//!
//! Merges a parsed bookmark forest into a user's tree below a target path.
//! A node whose name already exists under the same parent is reused instead
//! of duplicated, so importing the same file twice changes nothing the
//! second time. All inserts of one import share a single transaction; the
//! search index and the change signal are only touched after it commits.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::managers::bookmark_store::{BookmarkStoreTrait, SqliteBookmarkStore};
use crate::managers::path_tree::{self, FIRST_SORT};
use crate::services::change_signal::{notify_changed, now_millis, ChangeSignalTrait};
use crate::services::document_parser::{self, ParsedNode};
use crate::services::search_index::SearchIndexTrait;
use crate::types::bookmark::{BookmarkNode, ImportSummary, NodeKind, SearchDocument};
use crate::types::errors::BookmarkError;

/// Imports parsed bookmark documents for one user at a time.
pub struct ImportEngine<'a> {
    conn: &'a Connection,
    index: &'a dyn SearchIndexTrait,
    signal: &'a dyn ChangeSignalTrait,
}

impl<'a> ImportEngine<'a> {
    pub fn new(
        conn: &'a Connection,
        index: &'a dyn SearchIndexTrait,
        signal: &'a dyn ChangeSignalTrait,
    ) -> Self {
        Self { conn, index, signal }
    }

    /// Parses an exported bookmark document and imports it.
    pub fn import_html(
        &self,
        user_id: i64,
        html: &str,
        target_path: &str,
    ) -> Result<ImportSummary, BookmarkError> {
        let forest = document_parser::parse_document(html);
        self.import_document(user_id, &forest, target_path)
    }

    /// Inserts `forest` below `target_path`, after any nodes already there.
    ///
    /// Storage failures roll the whole import back. Index failures after the
    /// commit are logged; `sync_user_bookmark` repairs the index.
    pub fn import_document(
        &self,
        user_id: i64,
        forest: &[ParsedNode],
        target_path: &str,
    ) -> Result<ImportSummary, BookmarkError> {
        tracing::debug!(
            user_id,
            nodes = document_parser::walk(forest).count(),
            "importing bookmark forest"
        );
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let store = SqliteBookmarkStore::new(&tx);
        path_tree::ensure_folder_path(&store, user_id, target_path)?;

        let base = path_tree::next_sibling_sort(&store, user_id, target_path)?;
        let mut walk = ImportWalk {
            store: &store,
            user_id,
            now: now_millis(),
            staged: Vec::new(),
            summary: ImportSummary::default(),
        };
        walk.insert_level(forest, target_path, base)?;
        let ImportWalk { staged, summary, .. } = walk;
        tx.commit()?;

        if let Err(err) = self.index.upsert_batch(&staged) {
            tracing::warn!(
                user_id,
                documents = staged.len(),
                error = %err,
                "failed to index imported links"
            );
        }
        notify_changed(self.signal, user_id);

        tracing::info!(
            user_id,
            target_path,
            folders = summary.folders_created,
            links = summary.links_created,
            reused = summary.reused,
            "imported bookmarks"
        );
        Ok(summary)
    }
}

/// State threaded through one recursive import.
struct ImportWalk<'s, S: BookmarkStoreTrait> {
    store: &'s S,
    user_id: i64,
    now: i64,
    staged: Vec<SearchDocument>,
    summary: ImportSummary,
}

impl<'s, S: BookmarkStoreTrait> ImportWalk<'s, S> {
    /// Inserts `nodes` as siblings at `path`, the i-th one at `sort_base + i`.
    fn insert_level(
        &mut self,
        nodes: &[ParsedNode],
        path: &str,
        sort_base: i32,
    ) -> Result<(), BookmarkError> {
        for (offset, node) in nodes.iter().enumerate() {
            let sort = sort_base + offset as i32;
            match node {
                ParsedNode::Link { name, url, icon, created_at } => {
                    let candidate = BookmarkNode {
                        id: 0,
                        user_id: self.user_id,
                        kind: NodeKind::Link,
                        name: name.clone(),
                        path: path.to_string(),
                        sort,
                        url: url.clone(),
                        icon: icon.clone(),
                        add_time: created_at.unwrap_or(self.now),
                        create_time: self.now,
                    };
                    if let Some(id) = self.insert_or_reuse(&candidate)? {
                        self.summary.links_created += 1;
                        self.staged.push(SearchDocument {
                            id,
                            user_id: self.user_id,
                            name: candidate.name,
                            url: candidate.url,
                        });
                    }
                }
                ParsedNode::Folder { name, children, .. } => {
                    let candidate = BookmarkNode {
                        id: 0,
                        user_id: self.user_id,
                        kind: NodeKind::Folder,
                        name: name.clone(),
                        path: path.to_string(),
                        sort,
                        url: String::new(),
                        icon: String::new(),
                        add_time: 0,
                        create_time: self.now,
                    };
                    match self.insert_or_reuse(&candidate)? {
                        Some(id) => {
                            self.summary.folders_created += 1;
                            let inner = path_tree::child_path(id, path);
                            self.insert_level(children, &inner, FIRST_SORT)?;
                        }
                        None => self.merge_into_existing(name, path, children)?,
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the new id, or `None` when a sibling with the same name exists.
    fn insert_or_reuse(&mut self, candidate: &BookmarkNode) -> Result<Option<i64>, BookmarkError> {
        let existing = self.store.select_id_by_name_and_path(
            self.user_id,
            &candidate.name,
            &candidate.path,
        )?;
        if existing.is_some() {
            self.summary.reused += 1;
            return Ok(None);
        }
        self.store.insert_one(candidate).map(Some)
    }

    /// Appends `children` after the current contents of an existing folder.
    fn merge_into_existing(
        &mut self,
        name: &str,
        path: &str,
        children: &[ParsedNode],
    ) -> Result<(), BookmarkError> {
        let existing = self
            .store
            .select_id_by_name_and_path(self.user_id, name, path)?
            .and_then(|id| self.store.get_by_id(self.user_id, id).transpose())
            .transpose()?;
        match existing {
            Some(folder) if folder.kind == NodeKind::Folder => {
                let inner = path_tree::child_path(folder.id, path);
                let base = path_tree::next_sibling_sort(self.store, self.user_id, &inner)?;
                self.insert_level(children, &inner, base)
            }
            _ => {
                tracing::debug!(name, path, "folder name taken by a link, skipping its subtree");
                Ok(())
            }
        }
    }
}
