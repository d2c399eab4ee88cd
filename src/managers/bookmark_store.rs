//! Bookmark tree storage.
//!
//! Implements `BookmarkStoreTrait`, the intent-level storage operations the
//! engines need ("insert node", "max sibling sort", "reparent subtree"),
//! backed by SQLite via `rusqlite`. Every query is scoped by `user_id`; a
//! foreign id simply matches no rows.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::managers::path_tree;
use crate::types::bookmark::{BookmarkNode, NodeKind};
use crate::types::errors::BookmarkError;

/// Storage operations over one user's materialized-path tree.
pub trait BookmarkStoreTrait {
    /// Largest `sort` among the siblings at `path`, `None` for an empty group.
    fn select_max_sort(&self, user_id: i64, path: &str) -> Result<Option<i32>, BookmarkError>;
    /// Inserts a node and returns the id assigned by storage. The node's own
    /// `id` field is ignored. Fails with `Conflict` on a duplicate name or sort.
    fn insert_one(&self, node: &BookmarkNode) -> Result<i64, BookmarkError>;
    fn select_id_by_name_and_path(
        &self,
        user_id: i64,
        name: &str,
        path: &str,
    ) -> Result<Option<i64>, BookmarkError>;
    fn get_by_id(&self, user_id: i64, id: i64) -> Result<Option<BookmarkNode>, BookmarkError>;
    /// Every node of the user, ordered by path then sort.
    fn get_list_by_user_id(&self, user_id: i64) -> Result<Vec<BookmarkNode>, BookmarkError>;
    /// One sibling group, ordered by sort.
    fn get_list_by_user_id_and_path(
        &self,
        user_id: i64,
        path: &str,
    ) -> Result<Vec<BookmarkNode>, BookmarkError>;
    /// Ids of every node below `folder_id` (not including the folder itself).
    fn get_children_bookmark_id(
        &self,
        user_id: i64,
        folder_id: i64,
    ) -> Result<Vec<i64>, BookmarkError>;
    /// Subset of `ids` owned by the user.
    fn select_owned_ids(&self, user_id: i64, ids: &[i64]) -> Result<Vec<i64>, BookmarkError>;
    /// Deletes a folder together with its whole subtree. Returns rows removed.
    fn delete_folder(&self, user_id: i64, folder_id: i64) -> Result<usize, BookmarkError>;
    fn delete_bookmarks(&self, user_id: i64, ids: &[i64]) -> Result<usize, BookmarkError>;
    /// Replaces the `old_prefix` of every path equal to or below it.
    fn update_children_path(
        &self,
        user_id: i64,
        old_prefix: &str,
        new_prefix: &str,
    ) -> Result<usize, BookmarkError>;
    fn update_path_and_sort(
        &self,
        user_id: i64,
        id: i64,
        path: &str,
        sort: i32,
    ) -> Result<usize, BookmarkError>;
    /// Shifts every sibling at `path` whose sort is `>= sort` up by one.
    fn sort_plus_from(&self, user_id: i64, path: &str, sort: i32) -> Result<usize, BookmarkError>;
    /// Overwrites the editable attributes (name, url, icon) of a node.
    fn edit_bookmark(&self, user_id: i64, node: &BookmarkNode) -> Result<usize, BookmarkError>;
    /// One page of the user's nodes of `kind`, ordered by id.
    fn select_page(
        &self,
        user_id: i64,
        kind: NodeKind,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BookmarkNode>, BookmarkError>;
}

const NODE_COLUMNS: &str = "id, user_id, type, name, path, sort, url, icon, add_time, create_time";

/// Bookmark store backed by a SQLite connection (or a transaction, which
/// dereferences to one).
pub struct SqliteBookmarkStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteBookmarkStore<'a> {
    /// Creates a new store over the provided connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Reads a single `bookmark` row into a node.
    fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<BookmarkNode> {
        let raw_kind: i32 = row.get(2)?;
        let kind = NodeKind::from_i32(raw_kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Integer,
                format!("unknown bookmark type {}", raw_kind).into(),
            )
        })?;
        Ok(BookmarkNode {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind,
            name: row.get(3)?,
            path: row.get(4)?,
            sort: row.get(5)?,
            url: row.get(6)?,
            icon: row.get(7)?,
            add_time: row.get(8)?,
            create_time: row.get(9)?,
        })
    }

    fn query_nodes<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<BookmarkNode>, BookmarkError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_node)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn folder_subtree_prefix(
        &self,
        user_id: i64,
        folder_id: i64,
    ) -> Result<Option<String>, BookmarkError> {
        let path: Option<String> = self
            .conn
            .query_row(
                "SELECT path FROM bookmark WHERE user_id = ?1 AND id = ?2 AND type = ?3",
                params![user_id, folder_id, NodeKind::Folder.as_i32()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.map(|p| path_tree::child_path(folder_id, &p)))
    }

    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(", ")
    }
}

impl<'a> BookmarkStoreTrait for SqliteBookmarkStore<'a> {
    fn select_max_sort(&self, user_id: i64, path: &str) -> Result<Option<i32>, BookmarkError> {
        let max: Option<i32> = self.conn.query_row(
            "SELECT MAX(sort) FROM bookmark WHERE user_id = ?1 AND path = ?2",
            params![user_id, path],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn insert_one(&self, node: &BookmarkNode) -> Result<i64, BookmarkError> {
        self.conn.execute(
            "INSERT INTO bookmark (user_id, type, name, path, sort, url, icon, add_time, create_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                node.user_id,
                node.kind.as_i32(),
                node.name,
                node.path,
                node.sort,
                node.url,
                node.icon,
                node.add_time,
                node.create_time
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn select_id_by_name_and_path(
        &self,
        user_id: i64,
        name: &str,
        path: &str,
    ) -> Result<Option<i64>, BookmarkError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM bookmark WHERE user_id = ?1 AND name = ?2 AND path = ?3",
                params![user_id, name, path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn get_by_id(&self, user_id: i64, id: i64) -> Result<Option<BookmarkNode>, BookmarkError> {
        let sql = format!("SELECT {} FROM bookmark WHERE user_id = ?1 AND id = ?2", NODE_COLUMNS);
        let node = self
            .conn
            .query_row(&sql, params![user_id, id], Self::row_to_node)
            .optional()?;
        Ok(node)
    }

    fn get_list_by_user_id(&self, user_id: i64) -> Result<Vec<BookmarkNode>, BookmarkError> {
        let sql = format!(
            "SELECT {} FROM bookmark WHERE user_id = ?1 ORDER BY path, sort",
            NODE_COLUMNS
        );
        self.query_nodes(&sql, params![user_id])
    }

    fn get_list_by_user_id_and_path(
        &self,
        user_id: i64,
        path: &str,
    ) -> Result<Vec<BookmarkNode>, BookmarkError> {
        let sql = format!(
            "SELECT {} FROM bookmark WHERE user_id = ?1 AND path = ?2 ORDER BY sort",
            NODE_COLUMNS
        );
        self.query_nodes(&sql, params![user_id, path])
    }

    fn get_children_bookmark_id(
        &self,
        user_id: i64,
        folder_id: i64,
    ) -> Result<Vec<i64>, BookmarkError> {
        let prefix = match self.folder_subtree_prefix(user_id, folder_id)? {
            Some(prefix) => prefix,
            None => return Ok(Vec::new()),
        };
        let mut stmt = self.conn.prepare(
            "SELECT id FROM bookmark WHERE user_id = ?1 AND (path = ?2 OR path LIKE ?2 || '.%')",
        )?;
        let rows = stmt.query_map(params![user_id, prefix], |row| row.get::<_, i64>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn select_owned_ids(&self, user_id: i64, ids: &[i64]) -> Result<Vec<i64>, BookmarkError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id FROM bookmark WHERE user_id = ? AND id IN ({})",
            Self::placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let values = std::iter::once(user_id).chain(ids.iter().copied());
        let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, i64>(0))?;
        let mut owned = Vec::new();
        for row in rows {
            owned.push(row?);
        }
        Ok(owned)
    }

    fn delete_folder(&self, user_id: i64, folder_id: i64) -> Result<usize, BookmarkError> {
        let prefix = match self.folder_subtree_prefix(user_id, folder_id)? {
            Some(prefix) => prefix,
            None => return Ok(0),
        };
        let descendants = self.conn.execute(
            "DELETE FROM bookmark WHERE user_id = ?1 AND (path = ?2 OR path LIKE ?2 || '.%')",
            params![user_id, prefix],
        )?;
        let own = self.conn.execute(
            "DELETE FROM bookmark WHERE user_id = ?1 AND id = ?2",
            params![user_id, folder_id],
        )?;
        Ok(descendants + own)
    }

    fn delete_bookmarks(&self, user_id: i64, ids: &[i64]) -> Result<usize, BookmarkError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM bookmark WHERE user_id = ? AND id IN ({})",
            Self::placeholders(ids.len())
        );
        let values = std::iter::once(user_id).chain(ids.iter().copied());
        let affected = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(affected)
    }

    fn update_children_path(
        &self,
        user_id: i64,
        old_prefix: &str,
        new_prefix: &str,
    ) -> Result<usize, BookmarkError> {
        let affected = self.conn.execute(
            "UPDATE bookmark SET path = ?3 || substr(path, length(?2) + 1) \
             WHERE user_id = ?1 AND (path = ?2 OR path LIKE ?2 || '.%')",
            params![user_id, old_prefix, new_prefix],
        )?;
        Ok(affected)
    }

    fn update_path_and_sort(
        &self,
        user_id: i64,
        id: i64,
        path: &str,
        sort: i32,
    ) -> Result<usize, BookmarkError> {
        let affected = self.conn.execute(
            "UPDATE bookmark SET path = ?3, sort = ?4 WHERE user_id = ?1 AND id = ?2",
            params![user_id, id, path, sort],
        )?;
        Ok(affected)
    }

    fn sort_plus_from(&self, user_id: i64, path: &str, sort: i32) -> Result<usize, BookmarkError> {
        // SQLite checks uniqueness row by row, so shifting in place would
        // collide with the next sibling. Park the shifted rows on negative
        // slots first, then flip them back.
        let affected = self.conn.execute(
            "UPDATE bookmark SET sort = -(sort + 1) \
             WHERE user_id = ?1 AND path = ?2 AND sort >= ?3",
            params![user_id, path, sort],
        )?;
        self.conn.execute(
            "UPDATE bookmark SET sort = -sort WHERE user_id = ?1 AND path = ?2 AND sort < 0",
            params![user_id, path],
        )?;
        Ok(affected)
    }

    fn edit_bookmark(&self, user_id: i64, node: &BookmarkNode) -> Result<usize, BookmarkError> {
        let affected = self.conn.execute(
            "UPDATE bookmark SET name = ?3, url = ?4, icon = ?5 WHERE user_id = ?1 AND id = ?2",
            params![user_id, node.id, node.name, node.url, node.icon],
        )?;
        Ok(affected)
    }

    fn select_page(
        &self,
        user_id: i64,
        kind: NodeKind,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BookmarkNode>, BookmarkError> {
        let sql = format!(
            "SELECT {} FROM bookmark WHERE user_id = ?1 AND type = ?2 \
             ORDER BY id LIMIT ?3 OFFSET ?4",
            NODE_COLUMNS
        );
        self.query_nodes(&sql, params![user_id, kind.as_i32(), limit, offset])
    }
}
