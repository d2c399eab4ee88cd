use serde::{Deserialize, Serialize};

/// Kind of a node in a user's bookmark tree.
///
/// Persisted as an integer column: `0` for links, `1` for folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Link,
    Folder,
}

impl NodeKind {
    /// Storage representation of the kind.
    pub fn as_i32(self) -> i32 {
        match self {
            NodeKind::Link => 0,
            NodeKind::Folder => 1,
        }
    }

    /// Parses the storage representation. Unknown values yield `None`.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(NodeKind::Link),
            1 => Some(NodeKind::Folder),
            _ => None,
        }
    }
}

/// A folder or link in the materialized-path tree.
///
/// `path` is the dot-separated chain of ancestor ids, the empty string for
/// top-level nodes. `url`, `icon` and `add_time` are only meaningful for links;
/// folders carry empty strings there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkNode {
    pub id: i64,
    pub user_id: i64,
    pub kind: NodeKind,
    pub name: String,
    pub path: String,
    pub sort: i32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icon: String,
    /// Original bookmark creation time in milliseconds.
    #[serde(default)]
    pub add_time: i64,
    /// Time the node entered this store, in milliseconds.
    #[serde(default)]
    pub create_time: i64,
}

impl BookmarkNode {
    pub fn is_link(&self) -> bool {
        self.kind == NodeKind::Link
    }
}

/// Payload of an explicit single-node add. Storage assigns the id, the sort
/// slot and both timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icon: String,
}

/// Request to move one node (and, for a folder, its subtree) to another
/// position. `sort == -1` appends after the last sibling at `target_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveNodeBody {
    pub bookmark_id: i64,
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub target_path: String,
    pub sort: i32,
}

/// Sentinel sort value meaning "append at the end of the sibling group".
pub const APPEND_SORT: i32 = -1;

/// Denormalized projection of a link, as stored in the full-text index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub url: String,
}

impl SearchDocument {
    /// Projects a node into its search document. Folders have no document.
    pub fn from_node(node: &BookmarkNode) -> Option<Self> {
        if !node.is_link() {
            return None;
        }
        Some(Self {
            id: node.id,
            user_id: node.user_id,
            name: node.name.clone(),
            url: node.url.clone(),
        })
    }
}

/// Counters reported by a bookmark-file import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub folders_created: usize,
    pub links_created: usize,
    /// Nodes that already existed under the same name and parent.
    pub reused: usize,
}
