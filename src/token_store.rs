use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tauri::Runtime;

use crate::{AppError, AppResult};

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const STORE_FILE: &str = "localdesk.json";

trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn delete(&self, key: &str);
    fn save(&self) -> anyhow::Result<()>;
}

struct TauriStore<R: Runtime> {
    inner: Arc<tauri_plugin_store::Store<R>>,
}

impl<R: Runtime> KeyValueStore for TauriStore<R> {
    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .and_then(|value| value.as_str().map(str::to_owned))
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.set(key, value);
    }

    fn delete(&self, key: &str) {
        self.inner.delete(key);
    }

    fn save(&self) -> anyhow::Result<()> {
        self.inner.save().map_err(anyhow::Error::from)
    }
}

#[derive(Default)]
struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    // Recovers from poisoning so writes always land.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Where the remote API bearer token lives between runs.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn tauri<R: Runtime>(store: Arc<tauri_plugin_store::Store<R>>) -> Self {
        Self {
            inner: Arc::new(TauriStore { inner: store }),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(MemoryStore::default()),
        }
    }

    /// Blank tokens count as absent.
    pub fn token(&self) -> Option<String> {
        self.inner
            .get(AUTH_TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn set_token(&self, token: &str) -> AppResult<()> {
        self.inner.set(AUTH_TOKEN_KEY, token);
        self.persist()
    }

    pub fn clear_token(&self) -> AppResult<()> {
        self.inner.delete(AUTH_TOKEN_KEY);
        self.persist()
    }

    fn persist(&self) -> AppResult<()> {
        self.inner.save().map_err(|err| {
            tracing::warn!(target: "localdesk", event = "token_store_save_failed", error = %err);
            AppError::from(err).with_context("store", STORE_FILE)
        })
    }
}
