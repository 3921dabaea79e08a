use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use taskmgr::clock::Clock;
use taskmgr::db;

use crate::error::ApiError;

/// Shared handler state. Holds no task data: every request opens its own
/// connection, and SQLite serializes conflicting writers.
#[derive(Clone)]
pub struct AppState {
    db_path: Arc<str>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db_path: impl Into<Arc<str>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db_path: db_path.into(),
            clock,
        }
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Run `f` on a blocking thread with a fresh connection and the current
    /// instant.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection, DateTime<Utc>) -> taskmgr::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.db_path.clone();
        let now = self.clock.now();
        tokio::task::spawn_blocking(move || {
            let conn = db::open(&path)?;
            f(&conn, now)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("request worker failed: {e}")))?
        .map_err(ApiError::from)
    }
}
