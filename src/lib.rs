//! Bookmark service: a personal bookmark tree with import from exported
//! bookmark files and a full-text search index kept in step with it.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
