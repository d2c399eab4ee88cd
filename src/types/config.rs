use serde::{Deserialize, Serialize};

use crate::types::errors::ConfigError;

/// Maximum number of search hits returned to a client.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Rows read per page when rebuilding a user's search documents.
pub const DEFAULT_SYNC_PAGE_SIZE: i64 = 500;

/// Memory budget handed to the search index writer.
pub const DEFAULT_INDEX_WRITER_HEAP: usize = 50_000_000;

/// Service configuration, persisted as JSON.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite file. `None` places `bookmarks.db` under the data directory.
    pub database_path: Option<String>,
    /// Search index directory. `None` places `search-index/` under the data directory.
    pub index_path: Option<String>,
    pub search_limit: usize,
    pub sync_page_size: i64,
    pub index_writer_heap_bytes: usize,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            index_path: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
            sync_page_size: DEFAULT_SYNC_PAGE_SIZE,
            index_writer_heap_bytes: DEFAULT_INDEX_WRITER_HEAP,
            log_filter: "bookmark_service=info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Rejects values the engines cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "search_limit must be at least 1".to_string(),
            ));
        }
        if self.sync_page_size <= 0 {
            return Err(ConfigError::InvalidValue(
                "sync_page_size must be positive".to_string(),
            ));
        }
        // tantivy refuses writer budgets below a few megabytes
        if self.index_writer_heap_bytes < 15_000_000 {
            return Err(ConfigError::InvalidValue(
                "index_writer_heap_bytes must be at least 15000000".to_string(),
            ));
        }
        Ok(())
    }
}
