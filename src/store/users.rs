use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};
use ts_rs::TS;

use super::{require_text, LocalStore, WriteOutcome};
use crate::{time::now_ms, AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct User {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub email: String,
    #[ts(type = "number")]
    pub created_at: i64,
}

impl TryFrom<SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl LocalStore {
    /// Fails with a constraint error when `email` is already taken.
    pub async fn create_user(&self, name: &str, email: &str) -> AppResult<User> {
        let name = require_text("name", name)?;
        let email = require_text("email", email)?;
        let row = sqlx::query(
            "INSERT INTO users (name, email, created_at) VALUES (?, ?, ?) \
             RETURNING id, name, email, created_at",
        )
        .bind(name)
        .bind(email)
        .bind(now_ms())
        .fetch_one(self.pool())
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "create_user")
                .with_context("email", email.to_string())
        })?;
        Ok(User::try_from(row)?)
    }

    /// Newest first; rows created in the same millisecond fall back to id order.
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, name, email, created_at FROM users ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "list_users"))?;
        rows.into_iter()
            .map(|row| User::try_from(row).map_err(AppError::from))
            .collect()
    }

    pub async fn update_user(&self, id: i64, name: &str, email: &str) -> AppResult<WriteOutcome> {
        let name = require_text("name", name)?;
        let email = require_text("email", email)?;
        let result = sqlx::query("UPDATE users SET name = ?, email = ? WHERE id = ?")
            .bind(name)
            .bind(email)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|err| {
                AppError::from(err)
                    .with_context("operation", "update_user")
                    .with_context("id", id.to_string())
            })?;
        Ok(WriteOutcome::changed(result.rows_affected()))
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<WriteOutcome> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|err| {
                AppError::from(err)
                    .with_context("operation", "delete_user")
                    .with_context("id", id.to_string())
            })?;
        Ok(WriteOutcome::changed(result.rows_affected()))
    }
}
