use std::sync::Arc;

use tauri::{AppHandle, Manager, RunEvent, Runtime};
use tauri_plugin_store::StoreExt;

pub mod api;
pub mod bridge;
pub mod client;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod migrate;
pub mod screen;
pub mod shell;
pub mod state;
pub mod store;
pub mod time;
pub mod token_store;
pub mod util;

pub use error::{AppError, AppResult, ErrorKind};
pub use logging::{flush_file_logs, init_file_logging, init_logging};

use crate::api::ApiClient;
use crate::bridge::{Bridge, FileAccess};
use crate::config::{AppConfig, DB_FILE_NAME};
use crate::shell::{DesktopShell, TauriShell};
use crate::state::AppState;
use crate::store::LocalStore;
use crate::token_store::{TokenStore, STORE_FILE};

const STARTED_TITLE: &str = "App Started";
const STARTED_BODY: &str = "LocalDesk is now running!";

/// Register the IPC surface. Shared by the real app and the mock-runtime tests.
pub fn with_commands<R: Runtime>(builder: tauri::Builder<R>) -> tauri::Builder<R> {
    builder.invoke_handler(tauri::generate_handler![commands::bridge, commands::api])
}

fn setup_app<R: Runtime>(app: &AppHandle<R>) -> AppResult<()> {
    let config = AppConfig::from_env()?;
    let data_dir = config.resolve_data_dir(&shell::app_data_dir(app));
    std::fs::create_dir_all(&data_dir)
        .map_err(|err| AppError::from(err).with_context("path", data_dir.display().to_string()))?;
    if let Err(err) = init_file_logging(&data_dir.join("logs")) {
        tracing::warn!(target: "localdesk", event = "file_logging_unavailable", error = %err);
    }

    let db_path = data_dir.join(DB_FILE_NAME);
    let store = tauri::async_runtime::block_on(LocalStore::open(&db_path))?;

    let tokens = match app.store(STORE_FILE) {
        Ok(store) => TokenStore::tauri(store),
        Err(err) => {
            tracing::warn!(
                target: "localdesk",
                event = "token_store_unavailable",
                error = %err
            );
            TokenStore::in_memory()
        }
    };
    let api = ApiClient::from_config(&config, tokens)?;

    let shell: Arc<dyn DesktopShell> = Arc::new(TauriShell::new(app.clone()));
    let bridge = Bridge::new(store.clone(), Arc::clone(&shell), FileAccess::for_data_dir(&data_dir));
    app.manage(AppState {
        store,
        bridge,
        api,
        db_path: Arc::new(db_path.clone()),
    });

    tracing::info!(
        target: "localdesk",
        event = "app_started",
        data_dir = %data_dir.display(),
        db_path = %db_path.display(),
        api_base_url = %config.api_base_url
    );
    if let Err(err) = shell.notify(STARTED_TITLE, STARTED_BODY) {
        tracing::warn!(
            target: "localdesk",
            event = "notification_failed",
            title = STARTED_TITLE,
            code = err.code()
        );
    }
    Ok(())
}

fn handle_run_event<R: Runtime>(app: &AppHandle<R>, event: RunEvent) {
    match event {
        RunEvent::ExitRequested { api, code, .. } => {
            // macOS apps outlive their last window; an explicit exit carries a code.
            if cfg!(target_os = "macos") && code.is_none() {
                api.prevent_exit();
            }
        }
        RunEvent::Exit => {
            if let Some(state) = app.try_state::<AppState>() {
                tauri::async_runtime::block_on(state.shutdown());
            }
            flush_file_logs();
        }
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows,
            ..
        } => {
            if !has_visible_windows && app.get_webview_window(shell::MAIN_WINDOW_LABEL).is_none() {
                if let Err(err) = shell::create_main_window(app) {
                    err.log_with_event("window_recreate_failed");
                }
            }
        }
        _ => {}
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    error::install_panic_hook();

    let builder = tauri::Builder::default()
        .plugin(tauri_plugin_notification::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_store::Builder::default().build())
        .setup(|app| {
            setup_app(app.handle())?;
            Ok(())
        });

    match with_commands(builder).build(tauri::generate_context!()) {
        Ok(app) => app.run(handle_run_event),
        Err(err) => {
            tracing::error!(target: "localdesk", event = "app_build_failed", error = %err);
            flush_file_logs();
            std::process::exit(1);
        }
    }
}
