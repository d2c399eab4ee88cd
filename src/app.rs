//! App core for the bookmark service.
//!
//! Owns the long-lived resources: the SQLite database, the search index and
//! the loaded configuration. The engines borrow from it per request.

use crate::database::connection::Database;
use crate::services::bookmark_reader::BookmarkReader;
use crate::services::change_signal::SqliteChangeLog;
use crate::services::import_engine::ImportEngine;
use crate::services::index_sync::IndexSyncEngine;
use crate::services::mutation_engine::MutationEngine;
use crate::services::search_index::SearchIndex;
use crate::types::config::ServiceConfig;

pub struct App {
    pub db: Database,
    pub index: SearchIndex,
    pub config: ServiceConfig,
}

impl App {
    /// Opens the database and search index at the locations `config` resolves to.
    pub fn new(config: ServiceConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let db_path = config.resolved_database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&db_path)?;
        let index = SearchIndex::open(
            config.resolved_index_path(),
            config.index_writer_heap_bytes,
        )?;

        tracing::info!(database = %db_path.display(), "bookmark service ready");
        Ok(Self { db, index, config })
    }

    /// Everything in memory; used by tests.
    pub fn in_memory() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            db: Database::open_in_memory()?,
            index: SearchIndex::in_memory()?,
            config: ServiceConfig::default(),
        })
    }

    pub fn change_log(&self) -> SqliteChangeLog<'_> {
        SqliteChangeLog::new(self.db.connection())
    }

    pub fn importer<'a>(&'a self, signal: &'a SqliteChangeLog<'a>) -> ImportEngine<'a> {
        ImportEngine::new(self.db.connection(), &self.index, signal)
    }

    pub fn mutations<'a>(&'a self, signal: &'a SqliteChangeLog<'a>) -> MutationEngine<'a> {
        MutationEngine::new(self.db.connection(), &self.index, signal)
    }

    pub fn index_sync(&self) -> IndexSyncEngine<'_> {
        IndexSyncEngine::with_page_size(
            self.db.connection(),
            &self.index,
            self.config.sync_page_size,
        )
    }

    pub fn reader(&self) -> BookmarkReader<'_> {
        BookmarkReader::new(self.db.connection(), &self.index)
            .with_search_limit(self.config.search_limit)
    }
}
