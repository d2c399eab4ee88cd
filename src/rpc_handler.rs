//! RPC method handler for the bookmark JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! Every method takes an explicit `user_id`; the caller is trusted to have
//! authenticated it.

use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::app::App;
use crate::services::document_parser::{self, ParsedNode};
use crate::types::bookmark::{BookmarkNode, MoveNodeBody, NewBookmark, NodeKind};

/// Decode base64 string to bytes.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    BASE64.decode(input).map_err(|e| format!("base64 decode error: {}", e))
}

fn param_i64(params: &Value, key: &str) -> Result<i64, String> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| format!("missing {}", key))
}

fn param_str<'v>(params: &'v Value, key: &str) -> &'v str {
    params.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn param_ids(params: &Value, key: &str) -> Result<Vec<i64>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_i64().ok_or_else(|| format!("{} must contain integers", key)))
            .collect(),
        Some(_) => Err(format!("{} must be an array", key)),
    }
}

fn param_body<T: DeserializeOwned>(params: &Value) -> Result<T, String> {
    serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {}", e))
}

/// Parsed forest for `bookmark.import`, from `file`, `content` or `content_base64`.
fn import_forest(params: &Value) -> Result<Vec<ParsedNode>, String> {
    if let Some(file) = params.get("file").and_then(|v| v.as_str()) {
        return document_parser::parse_file(file).map_err(|e| e.to_string());
    }
    if let Some(content) = params.get("content").and_then(|v| v.as_str()) {
        return Ok(document_parser::parse_document(content));
    }
    if let Some(encoded) = params.get("content_base64").and_then(|v| v.as_str()) {
        let bytes = base64_decode(encoded)?;
        return Ok(document_parser::parse_document(&String::from_utf8_lossy(&bytes)));
    }
    Err("missing file, content or content_base64".to_string())
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "bookmark.import" => {
            let user_id = param_i64(params, "user_id")?;
            let target_path = param_str(params, "target_path");
            let forest = import_forest(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let signal = a.change_log();
            let summary = a
                .importer(&signal)
                .import_document(user_id, &forest, target_path)
                .map_err(|e| e.to_string())?;
            Ok(json!(summary))
        }
        "bookmark.add" => {
            let user_id = param_i64(params, "user_id")?;
            let new: NewBookmark = param_body(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let signal = a.change_log();
            let node = a.mutations(&signal).add_one(user_id, &new).map_err(|e| e.to_string())?;
            Ok(json!(node))
        }
        "bookmark.update" => {
            let user_id = param_i64(params, "user_id")?;
            let node = BookmarkNode {
                id: param_i64(params, "id")?,
                user_id,
                kind: NodeKind::Link,
                name: param_str(params, "name").to_string(),
                path: String::new(),
                sort: 0,
                url: param_str(params, "url").to_string(),
                icon: param_str(params, "icon").to_string(),
                add_time: 0,
                create_time: 0,
            };
            let a = app.lock().map_err(|e| e.to_string())?;
            let signal = a.change_log();
            let updated = a
                .mutations(&signal)
                .update_one(user_id, &node)
                .map_err(|e| e.to_string())?;
            Ok(json!({"updated": updated}))
        }
        "bookmark.delete" => {
            let user_id = param_i64(params, "user_id")?;
            let folder_ids = param_ids(params, "folder_ids")?;
            let bookmark_ids = param_ids(params, "bookmark_ids")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let signal = a.change_log();
            let removed = a
                .mutations(&signal)
                .batch_delete(user_id, &folder_ids, &bookmark_ids)
                .map_err(|e| e.to_string())?;
            let mut deleted: Vec<i64> = removed.into_iter().collect();
            deleted.sort_unstable();
            Ok(json!({"deleted": deleted}))
        }
        "bookmark.move" => {
            let user_id = param_i64(params, "user_id")?;
            let body: MoveNodeBody = param_body(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let signal = a.change_log();
            let node = a.mutations(&signal).move_node(user_id, &body).map_err(|e| e.to_string())?;
            Ok(json!(node))
        }
        "bookmark.tree" => {
            let user_id = param_i64(params, "user_id")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let tree = a.reader().get_tree(user_id).map_err(|e| e.to_string())?;
            Ok(json!(tree))
        }
        "bookmark.get" => {
            let user_id = param_i64(params, "user_id")?;
            let id = param_i64(params, "id")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let node = a.reader().get_node(user_id, id).map_err(|e| e.to_string())?;
            Ok(json!(node))
        }
        "bookmark.list" => {
            let user_id = param_i64(params, "user_id")?;
            let path = param_str(params, "path");
            let a = app.lock().map_err(|e| e.to_string())?;
            let nodes = a.reader().list_by_path(user_id, path).map_err(|e| e.to_string())?;
            Ok(json!(nodes))
        }
        "bookmark.search" => {
            let user_id = param_i64(params, "user_id")?;
            let query = params.get("query").and_then(|v| v.as_str()).ok_or("missing query")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let hits = a.reader().search_user_bookmark(user_id, query).map_err(|e| e.to_string())?;
            Ok(json!(hits))
        }
        "bookmark.sync" => {
            let user_id = param_i64(params, "user_id")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let indexed = a.index_sync().sync_user_bookmark(user_id).map_err(|e| e.to_string())?;
            Ok(json!({"indexed": indexed}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
