use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use super::{ApiClient, ApiResponse, Credentials};
use crate::AppResult;

/// Remote calls the UI may route through the host's API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "op", content = "args", rename_all = "kebab-case")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub enum ApiRequest {
    GetUsers,
    GetUser {
        #[ts(type = "number")]
        id: i64,
    },
    CreateUser {
        user: Value,
    },
    UpdateUser {
        #[ts(type = "number")]
        id: i64,
        user: Value,
    },
    DeleteUser {
        #[ts(type = "number")]
        id: i64,
    },
    Login(Credentials),
    Logout,
    RefreshToken,
    SyncUserData {
        users: Value,
    },
    SyncSettings {
        settings: Value,
    },
    HealthCheck,
}

impl ApiRequest {
    pub fn op(&self) -> &'static str {
        match self {
            ApiRequest::GetUsers => "get-users",
            ApiRequest::GetUser { .. } => "get-user",
            ApiRequest::CreateUser { .. } => "create-user",
            ApiRequest::UpdateUser { .. } => "update-user",
            ApiRequest::DeleteUser { .. } => "delete-user",
            ApiRequest::Login(_) => "login",
            ApiRequest::Logout => "logout",
            ApiRequest::RefreshToken => "refresh-token",
            ApiRequest::SyncUserData { .. } => "sync-user-data",
            ApiRequest::SyncSettings { .. } => "sync-settings",
            ApiRequest::HealthCheck => "health-check",
        }
    }

    /// Run the request against `client`. The user list comes back as a JSON array.
    pub async fn send(self, client: &ApiClient) -> AppResult<ApiResponse<Value>> {
        let op = self.op();
        let start = Instant::now();
        let result = match self {
            ApiRequest::GetUsers => client.get_users().await.map(|response| ApiResponse {
                success: response.success,
                data: response.data.map(Value::Array),
                message: response.message,
                error: response.error,
            }),
            ApiRequest::GetUser { id } => client.get_user(id).await,
            ApiRequest::CreateUser { user } => client.create_user(&user).await,
            ApiRequest::UpdateUser { id, user } => client.update_user(id, &user).await,
            ApiRequest::DeleteUser { id } => client.delete_user(id).await,
            ApiRequest::Login(credentials) => client.login(&credentials).await,
            ApiRequest::Logout => client.logout().await,
            ApiRequest::RefreshToken => client.refresh_token().await,
            ApiRequest::SyncUserData { users } => client.sync_user_data(&users).await,
            ApiRequest::SyncSettings { settings } => client.sync_settings(&settings).await,
            ApiRequest::HealthCheck => client.health_check().await,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => tracing::info!(
                target: "localdesk",
                area = "api",
                op,
                success = response.success,
                elapsed_ms,
                "api_success"
            ),
            Err(err) => tracing::warn!(
                target: "localdesk",
                area = "api",
                op,
                code = err.code(),
                elapsed_ms,
                "api_failure"
            ),
        }
        result
    }
}
