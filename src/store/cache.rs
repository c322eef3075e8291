use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Row;
use ts_rs::TS;

use super::{require_key, LocalStore, WriteOutcome};
use crate::{time::now_ms, AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct CacheEntry {
    #[ts(type = "number")]
    pub id: i64,
    pub key: String,
    #[ts(type = "unknown")]
    pub value: Value,
    #[ts(type = "number")]
    pub created_at: i64,
}

fn decode(key: &str, text: &str) -> AppResult<Value> {
    serde_json::from_str(text).map_err(|err| {
        AppError::new(AppError::MALFORMED_CODE, "Stored value is not valid JSON")
            .with_context("key", key.to_string())
            .with_cause(err)
    })
}

fn storage_err(operation: &'static str, key: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |err| {
        AppError::from(err)
            .with_context("operation", operation)
            .with_context("key", key.to_string())
    }
}

impl LocalStore {
    /// Insert or overwrite `key`. An overwrite keeps the row id and `created_at`.
    pub async fn save(&self, key: &str, value: &Value) -> AppResult<WriteOutcome> {
        let key = require_key(key)?;
        let text = serde_json::to_string(value)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO local_cache (key, value, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value \
             RETURNING id",
        )
        .bind(key)
        .bind(&text)
        .bind(now_ms())
        .fetch_one(self.pool())
        .await
        .map_err(storage_err("save", key))?;
        Ok(WriteOutcome::inserted(id))
    }

    /// `Ok(None)` when the key is absent.
    pub async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let text: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_cache WHERE key = ?")
                .bind(key)
                .fetch_optional(self.pool())
                .await
                .map_err(storage_err("get", key))?;
        text.map(|text| decode(key, &text)).transpose()
    }

    /// Every entry in insertion order.
    pub async fn get_all(&self) -> AppResult<Vec<CacheEntry>> {
        let rows = sqlx::query("SELECT id, key, value, created_at FROM local_cache ORDER BY id")
            .fetch_all(self.pool())
            .await
            .map_err(|err| AppError::from(err).with_context("operation", "get_all"))?;
        rows.into_iter()
            .map(|row| -> AppResult<CacheEntry> {
                let key: String = row.try_get("key")?;
                let text: String = row.try_get("value")?;
                let value = decode(&key, &text)?;
                Ok(CacheEntry {
                    id: row.try_get("id")?,
                    key,
                    value,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Removes at most one row. Deleting a missing key reports zero changes.
    pub async fn delete(&self, key: &str) -> AppResult<WriteOutcome> {
        let result = sqlx::query("DELETE FROM local_cache WHERE key = ?")
            .bind(key)
            .execute(self.pool())
            .await
            .map_err(storage_err("delete", key))?;
        Ok(WriteOutcome::changed(result.rows_affected()))
    }
}
