use std::path::PathBuf;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::bridge::Bridge;
use crate::store::LocalStore;

/// Everything the running app shares between commands.
#[derive(Clone)]
pub struct AppState {
    pub store: LocalStore,
    pub bridge: Bridge,
    pub api: ApiClient,
    pub db_path: Arc<PathBuf>,
}

impl AppState {
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Close the database pool. Called once on exit.
    pub async fn shutdown(&self) {
        tracing::info!(
            target: "localdesk",
            event = "db_pool_closing",
            db_path = %self.db_path.display()
        );
        self.store.close().await;
    }
}
