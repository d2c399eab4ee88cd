//! Materialized-path primitives shared by the import and mutation engines.
//!
//! A node's `path` is the dot-separated chain of its ancestor ids, the empty
//! string at the top level. Sibling groups are `(user_id, path)` pairs and
//! `sort` is unique inside one group.

use std::collections::{BTreeMap, HashSet};

use crate::managers::bookmark_store::BookmarkStoreTrait;
use crate::types::bookmark::{BookmarkNode, NodeKind};
use crate::types::errors::BookmarkError;

/// Sort value given to the first node of an empty sibling group.
pub const FIRST_SORT: i32 = 1;

/// Next free sort slot at `path`: one past the current maximum, or
/// [`FIRST_SORT`] when the group is empty.
pub fn next_sibling_sort<S: BookmarkStoreTrait + ?Sized>(
    store: &S,
    user_id: i64,
    path: &str,
) -> Result<i32, BookmarkError> {
    Ok(match store.select_max_sort(user_id, path)? {
        Some(max) => max + 1,
        None => FIRST_SORT,
    })
}

/// Path of the children of `parent_id`, given the parent's own path.
pub fn child_path(parent_id: i64, parent_path: &str) -> String {
    if parent_path.is_empty() {
        parent_id.to_string()
    } else {
        format!("{}.{}", parent_path, parent_id)
    }
}

/// Ids of every node in the subtree below `folder_id`.
pub fn descendant_ids<S: BookmarkStoreTrait + ?Sized>(
    store: &S,
    user_id: i64,
    folder_id: i64,
) -> Result<HashSet<i64>, BookmarkError> {
    Ok(store
        .get_children_bookmark_id(user_id, folder_id)?
        .into_iter()
        .collect())
}

/// Checks that `path` names the children of an existing folder owned by the
/// user. The empty path (top level) always exists.
pub fn ensure_folder_path<S: BookmarkStoreTrait + ?Sized>(
    store: &S,
    user_id: i64,
    path: &str,
) -> Result<(), BookmarkError> {
    if path.is_empty() {
        return Ok(());
    }
    let ids = ancestor_ids(path);
    if ids.len() != path.split('.').count() {
        return Err(BookmarkError::InvalidInput(format!("malformed path '{}'", path)));
    }
    let owner = ids.last().copied().unwrap_or_default();
    match store.get_by_id(user_id, owner)? {
        Some(folder)
            if folder.kind == NodeKind::Folder && child_path(folder.id, &folder.path) == path =>
        {
            Ok(())
        }
        _ => Err(BookmarkError::NotFound(format!("folder path '{}'", path))),
    }
}

/// Ancestor ids encoded in `path`, outermost first. Segments that are not
/// ids are ignored.
pub fn ancestor_ids(path: &str) -> Vec<i64> {
    path.split('.')
        .filter_map(|segment| segment.parse().ok())
        .collect()
}

/// True when `path` is `prefix` itself or lies below it. Matching is per
/// segment, so `"1.2"` is not under `"1.23"`.
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Groups nodes into sibling groups keyed by path, each ordered by sort.
pub fn group_by_path(nodes: Vec<BookmarkNode>) -> BTreeMap<String, Vec<BookmarkNode>> {
    let mut tree: BTreeMap<String, Vec<BookmarkNode>> = BTreeMap::new();
    for node in nodes {
        tree.entry(node.path.clone()).or_default().push(node);
    }
    for siblings in tree.values_mut() {
        siblings.sort_by_key(|n| n.sort);
    }
    tree
}
