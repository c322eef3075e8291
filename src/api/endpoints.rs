use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ts_rs::TS;

use super::{ApiClient, ApiResponse};
use crate::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Pull `data.token` out of an auth response, if the server sent one.
fn issued_token(response: &ApiResponse<Value>) -> Option<&str> {
    response
        .data
        .as_ref()
        .and_then(|data| data.get("token"))
        .and_then(Value::as_str)
}

impl ApiClient {
    pub async fn get_users(&self) -> AppResult<ApiResponse<Vec<Value>>> {
        self.get("users").await
    }

    pub async fn get_user(&self, id: i64) -> AppResult<ApiResponse<Value>> {
        self.get(&format!("users/{id}")).await
    }

    pub async fn create_user(&self, user: &Value) -> AppResult<ApiResponse<Value>> {
        self.post("users", user).await
    }

    pub async fn update_user(&self, id: i64, user: &Value) -> AppResult<ApiResponse<Value>> {
        self.put(&format!("users/{id}"), user).await
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<ApiResponse<Value>> {
        self.delete(&format!("users/{id}")).await
    }

    /// A token issued in `data.token` is kept for later requests.
    pub async fn login(&self, credentials: &Credentials) -> AppResult<ApiResponse<Value>> {
        let response = self.post("auth/login", credentials).await?;
        if let Some(token) = issued_token(&response) {
            self.tokens().set_token(token)?;
        }
        Ok(response)
    }

    /// The stored token is dropped once the server accepts the logout.
    pub async fn logout(&self) -> AppResult<ApiResponse<Value>> {
        let response = self.post("auth/logout", &json!({})).await?;
        self.tokens().clear_token()?;
        Ok(response)
    }

    pub async fn refresh_token(&self) -> AppResult<ApiResponse<Value>> {
        let response = self.post("auth/refresh", &json!({})).await?;
        if let Some(token) = issued_token(&response) {
            self.tokens().set_token(token)?;
        }
        Ok(response)
    }

    pub async fn sync_user_data(&self, users: &Value) -> AppResult<ApiResponse<Value>> {
        self.post("sync/users", users).await
    }

    pub async fn sync_settings(&self, settings: &Value) -> AppResult<ApiResponse<Value>> {
        self.post("sync/settings", settings).await
    }

    pub async fn health_check(&self) -> AppResult<ApiResponse<Value>> {
        self.get("health").await
    }
}
