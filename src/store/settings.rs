use serde::{Deserialize, Serialize};
use sqlx::Row;
use ts_rs::TS;

use super::{require_key, LocalStore, WriteOutcome};
use crate::{time::now_ms, AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct Setting {
    pub key: String,
    pub value: String,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl LocalStore {
    pub async fn get_setting(&self, key: &str) -> AppResult<Option<Setting>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await
            .map_err(|err| {
                AppError::from(err)
                    .with_context("operation", "get_setting")
                    .with_context("key", key.to_string())
            })?;
        row.map(|row| -> AppResult<Setting> {
            Ok(Setting {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    /// Upsert; every write refreshes `updated_at`.
    pub async fn set_setting(&self, key: &str, value: &str) -> AppResult<WriteOutcome> {
        let key = require_key(key)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at \
             RETURNING id",
        )
        .bind(key)
        .bind(value)
        .bind(now_ms())
        .fetch_one(self.pool())
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "set_setting")
                .with_context("key", key.to_string())
        })?;
        Ok(WriteOutcome::inserted(id))
    }
}
