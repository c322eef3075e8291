//! OS-level capabilities the bridge may reach: notifications, native dialogs,
//! main-window controls and app metadata.
//!
//! [`TauriShell`] drives the real window through the Tauri plugins;
//! [`HeadlessShell`] stands in wherever no window exists (CLI, tests).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{AppError, AppResult};

mod headless;
mod tauri_shell;

pub use headless::{HeadlessShell, Notice, WindowState};
#[cfg(target_os = "macos")]
pub use tauri_shell::create_main_window;
pub use tauri_shell::{app_data_dir, TauriShell, MAIN_WINDOW_LABEL, MAIN_WINDOW_TITLE};

pub trait DesktopShell: Send + Sync {
    /// Show a desktop notification. `Ok(false)` when notifications are not available.
    fn notify(&self, title: &str, body: &str) -> AppResult<bool>;

    /// No-op when there is no main window.
    fn minimize_window(&self) -> AppResult<()>;

    /// Maximize, or restore when already maximized.
    fn toggle_maximize_window(&self) -> AppResult<()>;

    fn close_window(&self) -> AppResult<()>;

    fn show_message_box(
        &self,
        options: MessageBoxOptions,
    ) -> BoxFuture<'static, AppResult<MessageBoxResponse>>;

    fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> BoxFuture<'static, AppResult<SaveDialogResponse>>;

    fn show_open_dialog(
        &self,
        options: OpenDialogOptions,
    ) -> BoxFuture<'static, AppResult<OpenDialogResponse>>;

    fn app_version(&self) -> String;

    fn app_path(&self, name: AppPathName) -> AppResult<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub enum MessageBoxKind {
    #[default]
    None,
    Info,
    Error,
    Question,
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct MessageBoxOptions {
    #[serde(rename = "type")]
    pub kind: MessageBoxKind,
    #[ts(optional)]
    pub title: Option<String>,
    pub message: String,
    #[ts(optional)]
    pub detail: Option<String>,
    /// Button labels; index 0 is the affirmative choice.
    pub buttons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct MessageBoxResponse {
    /// Index of the button that was chosen.
    #[ts(type = "number")]
    pub response: usize,
    pub checkbox_checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct SaveDialogOptions {
    #[ts(optional)]
    pub title: Option<String>,
    #[ts(optional)]
    pub default_path: Option<String>,
    pub filters: Vec<FileFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct SaveDialogResponse {
    pub canceled: bool,
    #[ts(optional)]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub enum OpenDialogProperty {
    OpenFile,
    OpenDirectory,
    MultiSelections,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct OpenDialogOptions {
    #[ts(optional)]
    pub title: Option<String>,
    #[ts(optional)]
    pub default_path: Option<String>,
    pub filters: Vec<FileFilter>,
    pub properties: Vec<OpenDialogProperty>,
}

impl OpenDialogOptions {
    fn wants(&self, property: OpenDialogProperty) -> bool {
        self.properties.contains(&property)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct OpenDialogResponse {
    pub canceled: bool,
    pub file_paths: Vec<String>,
}

/// Well-known locations the UI may ask for by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPathName {
    Home,
    AppData,
    UserData,
    Temp,
    Exe,
    Desktop,
    Documents,
    Downloads,
    Music,
    Pictures,
    Videos,
    Logs,
}

impl AppPathName {
    pub const ALL: [AppPathName; 12] = [
        AppPathName::Home,
        AppPathName::AppData,
        AppPathName::UserData,
        AppPathName::Temp,
        AppPathName::Exe,
        AppPathName::Desktop,
        AppPathName::Documents,
        AppPathName::Downloads,
        AppPathName::Music,
        AppPathName::Pictures,
        AppPathName::Videos,
        AppPathName::Logs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppPathName::Home => "home",
            AppPathName::AppData => "appData",
            AppPathName::UserData => "userData",
            AppPathName::Temp => "temp",
            AppPathName::Exe => "exe",
            AppPathName::Desktop => "desktop",
            AppPathName::Documents => "documents",
            AppPathName::Downloads => "downloads",
            AppPathName::Music => "music",
            AppPathName::Pictures => "pictures",
            AppPathName::Videos => "videos",
            AppPathName::Logs => "logs",
        }
    }
}

impl fmt::Display for AppPathName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppPathName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppPathName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| {
                AppError::new("VALIDATION/UNKNOWN_PATH_NAME", "Unknown app path name")
                    .with_context("name", s.to_string())
            })
    }
}

fn shell_error(code: &'static str, err: impl fmt::Display) -> AppError {
    AppError::new(format!("SHELL/{code}"), err.to_string())
}
