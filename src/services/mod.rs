// Bookmark services
// The engines that change the tree, the search index they keep in step, and configuration.

pub mod bookmark_reader;
pub mod change_signal;
pub mod config_loader;
pub mod document_parser;
pub mod import_engine;
pub mod index_sync;
pub mod mutation_engine;
pub mod search_index;
