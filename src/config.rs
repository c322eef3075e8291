use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

/// Bundle identifier; must match `identifier` in `tauri.conf.json`.
pub const APP_IDENTIFIER: &str = "com.localdesk.app";
/// Name of the SQLite file inside the data directory.
pub const DB_FILE_NAME: &str = "local-data.db";
pub const DEFAULT_API_BASE_URL: &str = "https://api.example.com/v1";
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

pub const ENV_DATA_DIR: &str = "LOCALDESK_DATA_DIR";
pub const ENV_API_BASE_URL: &str = "LOCALDESK_API_BASE_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "LOCALDESK_API_TIMEOUT_SECS";

/// Runtime settings that are not part of the Tauri config.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Overrides the platform app data directory when set.
    pub data_dir: Option<PathBuf>,
    pub api_base_url: String,
    pub api_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = non_empty_var(ENV_DATA_DIR) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = non_empty_var(ENV_API_BASE_URL) {
            config.api_base_url = url;
        }
        if let Some(raw) = non_empty_var(ENV_API_TIMEOUT_SECS) {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("parse {ENV_API_TIMEOUT_SECS}={raw}"))?;
            config.api_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Data directory to use, falling back to `fallback` (the shell's app data dir).
    pub fn resolve_data_dir(&self, fallback: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| fallback.to_path_buf())
    }

    /// Data directory for contexts without a Tauri app (CLI).
    pub fn standalone_data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir()
            .or_else(|| std::env::current_dir().ok())
            .ok_or_else(|| anyhow::anyhow!("failed to resolve application data directory"))?;
        Ok(base.join(APP_IDENTIFIER))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_data_dir_wins_over_fallback() {
        let config = AppConfig {
            data_dir: Some(PathBuf::from("/tmp/override")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.resolve_data_dir(Path::new("/var/app")),
            PathBuf::from("/tmp/override")
        );
        assert_eq!(
            AppConfig::default().resolve_data_dir(Path::new("/var/app")),
            PathBuf::from("/var/app")
        );
    }

    #[test]
    fn defaults_point_at_example_api() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api_timeout, Duration::from_secs(30));
    }
}
