// Bookmark service shared type definitions
// Each submodule defines types used across the engines, the storage layer and the RPC surface.

pub mod bookmark;
pub mod config;
pub mod errors;
