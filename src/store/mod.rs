//! Local persistence: one SQLite file holding the key/value cache and the
//! `users`/`settings` tables.
//!
//! Every public operation is a single SQL statement, so SQLite's statement-level
//! atomicity is the only guarantee offered. No operation opens a transaction.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use ts_rs::TS;

use crate::{db, migrate, AppError, AppResult};

mod cache;
mod raw;
mod settings;
mod users;

pub use cache::CacheEntry;
pub use raw::ALLOWED_TABLES;
pub use settings::Setting;
pub use users::User;

/// Result of a single write statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct WriteOutcome {
    /// Row id assigned or touched by the statement, when it has one.
    #[ts(type = "number | null")]
    pub last_id: Option<i64>,
    /// Rows affected. Zero is a valid outcome for deletes and updates.
    #[ts(type = "number")]
    pub changes: u64,
}

impl WriteOutcome {
    fn changed(changes: u64) -> Self {
        Self {
            last_id: None,
            changes,
        }
    }

    fn inserted(id: i64) -> Self {
        Self {
            last_id: Some(id),
            changes: 1,
        }
    }
}

#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open the database file, creating it and its schema on first run.
    pub async fn open(db_path: &Path) -> AppResult<Self> {
        let pool = db::open_sqlite_pool(db_path).await.map_err(|err| {
            AppError::new("STORAGE/OPEN", "Failed to open the local database")
                .with_context("path", db_path.display().to_string())
                .with_cause(err)
        })?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn in_memory() -> AppResult<Self> {
        let pool = db::open_memory_pool().await.map_err(|err| {
            AppError::new("STORAGE/OPEN", "Failed to open an in-memory database").with_cause(err)
        })?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> AppResult<Self> {
        migrate::apply_migrations(&pool).await.map_err(|err| {
            AppError::new("STORAGE/MIGRATION", "Failed to prepare the database schema")
                .with_cause(err)
        })?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(target: "localdesk", event = "db_closed");
    }
}

fn validation(code: &str, message: impl Into<String>) -> AppError {
    AppError::new(format!("VALIDATION/{code}"), message)
}

fn require_text<'a>(field: &'static str, value: &'a str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation("REQUIRED_FIELD", format!("{field} is required"))
            .with_context("field", field));
    }
    Ok(trimmed)
}

/// Cache and setting keys are stored verbatim but may not be blank.
fn require_key(key: &str) -> AppResult<&str> {
    require_text("key", key)?;
    Ok(key)
}
