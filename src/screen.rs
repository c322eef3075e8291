//! Headless view-model of the main screen: local users, cached entries,
//! remote API status and a single status line.
//!
//! Every mutation refetches the list it touched. A failed action writes the
//! error into `status` and leaves the lists as they were.

use serde_json::Value;

use crate::api::ApiClient;
use crate::client::BridgeClient;
use crate::store::{CacheEntry, User};
use crate::time::now_ms;
use crate::AppResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ApiStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiStatus::Connected => "connected",
            ApiStatus::Disconnected => "disconnected",
        }
    }
}

pub struct DemoScreen {
    client: BridgeClient,
    api: Option<ApiClient>,
    pub users: Vec<User>,
    pub entries: Vec<CacheEntry>,
    pub api_users: Vec<Value>,
    pub app_version: Option<String>,
    pub api_status: ApiStatus,
    pub status: Option<String>,
}

impl DemoScreen {
    pub fn new(client: BridgeClient, api: Option<ApiClient>) -> Self {
        Self {
            client,
            api,
            users: Vec::new(),
            entries: Vec::new(),
            api_users: Vec::new(),
            app_version: None,
            api_status: ApiStatus::Disconnected,
            status: None,
        }
    }

    fn report<T>(&mut self, prefix: &str, result: AppResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(
                    target: "localdesk",
                    event = "screen_action_failed",
                    action = prefix,
                    code = err.code()
                );
                self.status = Some(format!("{prefix}: {err}"));
                None
            }
        }
    }

    /// Initial fetch. The version is only asked for when a bridge is present.
    pub async fn load(&mut self) {
        if self.client.is_available() {
            let version = self.client.get_app_version().await;
            if let Some(version) = self.report("Error loading version", version) {
                self.app_version = Some(version);
            }
        }
        self.reload_users().await;
        self.reload_entries().await;
    }

    async fn reload_users(&mut self) {
        let users = self.client.get_users().await;
        if let Some(users) = self.report("Error loading users", users) {
            self.users = users;
        }
    }

    async fn reload_entries(&mut self) {
        let entries = self.client.get_all_from_local().await;
        if let Some(entries) = self.report("Error loading local data", entries) {
            self.entries = entries;
        }
    }

    /// Blank fields are ignored, as the form would not submit them.
    pub async fn add_user(&mut self, name: &str, email: &str) {
        if name.trim().is_empty() || email.trim().is_empty() {
            return;
        }
        let created = self.client.create_user(name, email).await;
        if self.report("Error adding user", created).is_some() {
            self.reload_users().await;
            self.status = Some("User added successfully!".into());
        }
    }

    pub async fn edit_user(&mut self, id: i64, name: &str, email: &str) {
        if name.trim().is_empty() || email.trim().is_empty() {
            return;
        }
        let updated = self.client.update_user(id, name, email).await;
        if self.report("Error updating user", updated).is_some() {
            self.reload_users().await;
            self.status = Some("User updated successfully!".into());
        }
    }

    pub async fn remove_user(&mut self, id: i64) {
        let deleted = self.client.delete_user(id).await;
        if self.report("Error deleting user", deleted).is_some() {
            self.reload_users().await;
            self.status = Some("User deleted successfully!".into());
        }
    }

    /// The value is stored as JSON text when it parses, as a plain string otherwise.
    pub async fn save_entry(&mut self, key: &str, value: &str) {
        if key.is_empty() || value.is_empty() {
            return;
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.into()));
        let saved = self.client.save_to_local(key, &value).await;
        if self.report("Error saving", saved).is_some() {
            self.reload_entries().await;
            self.status = Some("Data saved to local database!".into());
        }
    }

    pub async fn remove_entry(&mut self, key: &str) {
        let deleted = self.client.delete_from_local(key).await;
        if self.report("Error deleting", deleted).is_some() {
            self.reload_entries().await;
            self.status = Some("Item deleted!".into());
        }
    }

    pub async fn check_api(&mut self) {
        self.api_status = match &self.api {
            Some(api) => match api.health_check().await {
                Ok(_) => ApiStatus::Connected,
                Err(_) => ApiStatus::Disconnected,
            },
            None => ApiStatus::Disconnected,
        };
    }

    pub async fn fetch_api_users(&mut self) {
        let Some(api) = self.api.clone() else {
            return;
        };
        let fetched = api.get_users().await;
        if let Some(response) = self.report("HTTP Error", fetched) {
            self.api_users = response.data.unwrap_or_default();
            self.status = Some("HTTP data loaded successfully!".into());
        }
    }

    /// Push the local user list to the remote API.
    pub async fn sync_data(&mut self) {
        let Some(api) = self.api.clone() else {
            return;
        };
        let users = match serde_json::to_value(&self.users) {
            Ok(users) => users,
            Err(err) => {
                self.status = Some(format!("Error syncing: {err}"));
                return;
            }
        };
        let synced = api.sync_user_data(&users).await;
        if self.report("Error syncing", synced).is_some() {
            self.status = Some("Data synced successfully!".into());
        }
    }

    /// Write the local users as JSON to `exports/` below the bridge's files root.
    pub async fn export_users(&mut self) -> Option<String> {
        let json = match serde_json::to_string_pretty(&self.users) {
            Ok(json) => json,
            Err(err) => {
                self.status = Some(format!("Error exporting: {err}"));
                return None;
            }
        };
        let path = format!("exports/users-{}.json", now_ms());
        let written = self.client.write_file(&path, &json).await;
        self.report("Error exporting", written)?;
        self.status = Some(format!("Users exported to {path}"));
        Some(path)
    }
}
