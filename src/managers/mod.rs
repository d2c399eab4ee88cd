// Bookmark tree state
// The materialized-path primitives and the storage collaborator they run against.

pub mod bookmark_store;
pub mod path_tree;
