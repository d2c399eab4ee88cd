//! "This user's bookmarks changed at time T" notifications.
//!
//! Signals are consumed by cache invalidation outside this crate and are
//! never read back here. Publishing is fire-and-forget: a failure is logged
//! and never fails the operation that produced the change.

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection};

use crate::types::errors::BookmarkError;

/// Sink for per-user change notifications.
pub trait ChangeSignalTrait {
    fn publish(&self, user_id: i64, timestamp_millis: i64) -> Result<(), BookmarkError>;
}

/// Appends signals to the `bookmark_update_log` table.
pub struct SqliteChangeLog<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteChangeLog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> ChangeSignalTrait for SqliteChangeLog<'a> {
    fn publish(&self, user_id: i64, timestamp_millis: i64) -> Result<(), BookmarkError> {
        self.conn.execute(
            "INSERT INTO bookmark_update_log (user_id, update_time) VALUES (?1, ?2)",
            params![user_id, timestamp_millis],
        )?;
        Ok(())
    }
}

/// Current UNIX time in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Publishes a change for `user_id` stamped with the current time, logging
/// instead of propagating a failure.
pub fn notify_changed(signal: &dyn ChangeSignalTrait, user_id: i64) {
    if let Err(err) = signal.publish(user_id, now_millis()) {
        tracing::warn!(user_id, error = %err, "failed to publish bookmark change signal");
    }
}
