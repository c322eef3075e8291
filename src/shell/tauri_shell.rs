use std::path::PathBuf;

use futures::future::BoxFuture;
use tauri::plugin::PermissionState;
use tauri::{AppHandle, Manager, Runtime, WebviewWindow};
use tauri_plugin_dialog::{DialogExt, FileDialogBuilder, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_notification::NotificationExt;
use tokio::sync::oneshot;

use super::{
    shell_error, AppPathName, DesktopShell, MessageBoxKind, MessageBoxOptions,
    MessageBoxResponse, OpenDialogOptions, OpenDialogProperty, OpenDialogResponse,
    SaveDialogOptions, SaveDialogResponse,
};
use crate::{AppError, AppResult};

/// Label of the single application window, as declared in `tauri.conf.json`.
pub const MAIN_WINDOW_LABEL: &str = "main";
pub const MAIN_WINDOW_TITLE: &str = "LocalDesk";
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
const MAIN_WINDOW_SIZE: (f64, f64) = (1200.0, 800.0);

pub struct TauriShell<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriShell<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }

    fn main_window(&self) -> Option<WebviewWindow<R>> {
        self.app.get_webview_window(MAIN_WINDOW_LABEL)
    }
}

fn dialog_dropped() -> AppError {
    AppError::new("SHELL/DIALOG_DROPPED", "The dialog closed without an answer")
}

fn apply_file_options<R: Runtime>(
    mut builder: FileDialogBuilder<R>,
    title: Option<String>,
    default_path: Option<String>,
    filters: &[super::FileFilter],
) -> FileDialogBuilder<R> {
    if let Some(title) = title {
        builder = builder.set_title(title);
    }
    for filter in filters {
        let extensions: Vec<&str> = filter.extensions.iter().map(String::as_str).collect();
        builder = builder.add_filter(filter.name.clone(), &extensions);
    }
    if let Some(default_path) = default_path {
        let path = PathBuf::from(default_path);
        if path.is_dir() {
            builder = builder.set_directory(&path);
        } else {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                builder = builder.set_directory(dir);
            }
            if let Some(name) = path.file_name() {
                builder = builder.set_file_name(name.to_string_lossy());
            }
        }
    }
    builder
}

impl<R: Runtime> DesktopShell for TauriShell<R> {
    fn notify(&self, title: &str, body: &str) -> AppResult<bool> {
        let notification = self.app.notification();
        let permission = notification
            .permission_state()
            .map_err(|err| shell_error("NOTIFICATION", err))?;
        if permission != PermissionState::Granted {
            return Ok(false);
        }
        notification
            .builder()
            .title(title)
            .body(body)
            .show()
            .map_err(|err| shell_error("NOTIFICATION", err))?;
        Ok(true)
    }

    fn minimize_window(&self) -> AppResult<()> {
        if let Some(window) = self.main_window() {
            window
                .minimize()
                .map_err(|err| shell_error("WINDOW", err))?;
        }
        Ok(())
    }

    fn toggle_maximize_window(&self) -> AppResult<()> {
        if let Some(window) = self.main_window() {
            let maximized = window
                .is_maximized()
                .map_err(|err| shell_error("WINDOW", err))?;
            let result = if maximized {
                window.unmaximize()
            } else {
                window.maximize()
            };
            result.map_err(|err| shell_error("WINDOW", err))?;
        }
        Ok(())
    }

    fn close_window(&self) -> AppResult<()> {
        if let Some(window) = self.main_window() {
            window.close().map_err(|err| shell_error("WINDOW", err))?;
        }
        Ok(())
    }

    fn show_message_box(
        &self,
        options: MessageBoxOptions,
    ) -> BoxFuture<'static, AppResult<MessageBoxResponse>> {
        let app = self.app.clone();
        Box::pin(async move {
            let kind = match options.kind {
                MessageBoxKind::Error => MessageDialogKind::Error,
                MessageBoxKind::Warning => MessageDialogKind::Warning,
                MessageBoxKind::None | MessageBoxKind::Info | MessageBoxKind::Question => {
                    MessageDialogKind::Info
                }
            };
            let buttons = match options.buttons.as_slice() {
                [] => MessageDialogButtons::Ok,
                [ok] => MessageDialogButtons::OkCustom(ok.clone()),
                [ok, cancel, ..] => MessageDialogButtons::OkCancelCustom(ok.clone(), cancel.clone()),
            };
            let text = match &options.detail {
                Some(detail) => format!("{}\n\n{}", options.message, detail),
                None => options.message.clone(),
            };

            let (tx, rx) = oneshot::channel();
            let mut builder = app.dialog().message(text).kind(kind).buttons(buttons);
            if let Some(title) = options.title.clone() {
                builder = builder.title(title);
            }
            builder.show(move |confirmed| {
                let _ = tx.send(confirmed);
            });
            let confirmed = rx.await.map_err(|_| dialog_dropped())?;
            let response = if confirmed || options.buttons.len() <= 1 { 0 } else { 1 };
            Ok(MessageBoxResponse {
                response,
                checkbox_checked: false,
            })
        })
    }

    fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> BoxFuture<'static, AppResult<SaveDialogResponse>> {
        let app = self.app.clone();
        Box::pin(async move {
            let builder = apply_file_options(
                app.dialog().file(),
                options.title,
                options.default_path,
                &options.filters,
            );
            let (tx, rx) = oneshot::channel();
            builder.save_file(move |path| {
                let _ = tx.send(path.map(|path| path.to_string()));
            });
            let file_path = rx.await.map_err(|_| dialog_dropped())?;
            Ok(SaveDialogResponse {
                canceled: file_path.is_none(),
                file_path,
            })
        })
    }

    fn show_open_dialog(
        &self,
        options: OpenDialogOptions,
    ) -> BoxFuture<'static, AppResult<OpenDialogResponse>> {
        let app = self.app.clone();
        Box::pin(async move {
            let directory = options.wants(OpenDialogProperty::OpenDirectory);
            let multiple = options.wants(OpenDialogProperty::MultiSelections);
            let builder = apply_file_options(
                app.dialog().file(),
                options.title.clone(),
                options.default_path.clone(),
                &options.filters,
            );
            let (tx, rx) = oneshot::channel::<Vec<String>>();
            match (directory, multiple) {
                (true, _) => builder.pick_folder(move |path| {
                    let _ = tx.send(path.map(|p| vec![p.to_string()]).unwrap_or_default());
                }),
                (false, true) => builder.pick_files(move |paths| {
                    let picked = paths
                        .map(|paths| paths.into_iter().map(|p| p.to_string()).collect())
                        .unwrap_or_default();
                    let _ = tx.send(picked);
                }),
                (false, false) => builder.pick_file(move |path| {
                    let _ = tx.send(path.map(|p| vec![p.to_string()]).unwrap_or_default());
                }),
            }
            let file_paths = rx.await.map_err(|_| dialog_dropped())?;
            Ok(OpenDialogResponse {
                canceled: file_paths.is_empty(),
                file_paths,
            })
        })
    }

    fn app_version(&self) -> String {
        self.app.package_info().version.to_string()
    }

    fn app_path(&self, name: AppPathName) -> AppResult<PathBuf> {
        let resolver = self.app.path();
        let resolved = match name {
            AppPathName::Exe => return std::env::current_exe().map_err(AppError::from),
            AppPathName::Home => resolver.home_dir(),
            AppPathName::AppData => resolver.data_dir(),
            AppPathName::UserData => resolver.app_data_dir(),
            AppPathName::Temp => resolver.temp_dir(),
            AppPathName::Desktop => resolver.desktop_dir(),
            AppPathName::Documents => resolver.document_dir(),
            AppPathName::Downloads => resolver.download_dir(),
            AppPathName::Music => resolver.audio_dir(),
            AppPathName::Pictures => resolver.picture_dir(),
            AppPathName::Videos => resolver.video_dir(),
            AppPathName::Logs => resolver.app_log_dir(),
        };
        resolved.map_err(|err| {
            shell_error("PATH_UNAVAILABLE", err).with_context("name", name.as_str())
        })
    }
}

/// App data directory of a running Tauri app, falling back to the temp dir.
pub fn app_data_dir<R: Runtime>(app: &AppHandle<R>) -> PathBuf {
    app.path()
        .app_data_dir()
        .unwrap_or_else(|_| std::env::temp_dir().join(crate::config::APP_IDENTIFIER))
}

/// Build the main window with the same geometry `tauri.conf.json` declares.
#[cfg(target_os = "macos")]
pub fn create_main_window<R: Runtime>(app: &AppHandle<R>) -> AppResult<()> {
    let (width, height) = MAIN_WINDOW_SIZE;
    tauri::WebviewWindowBuilder::new(app, MAIN_WINDOW_LABEL, tauri::WebviewUrl::default())
        .title(MAIN_WINDOW_TITLE)
        .inner_size(width, height)
        .build()
        .map_err(|err| shell_error("WINDOW", err))?;
    Ok(())
}
