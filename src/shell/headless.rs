use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{self, BoxFuture};

use super::{
    shell_error, AppPathName, DesktopShell, MessageBoxOptions, MessageBoxResponse,
    OpenDialogOptions, OpenDialogResponse, SaveDialogOptions, SaveDialogResponse,
};
use crate::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowState {
    pub minimized: u32,
    pub maximized: bool,
    pub closed: bool,
}

#[derive(Default)]
struct Inner {
    base_dir: PathBuf,
    version: String,
    fail_notifications: AtomicBool,
    message_box_answer: AtomicUsize,
    notices: Mutex<Vec<Notice>>,
    window: Mutex<WindowState>,
    save_answer: Mutex<Option<String>>,
    open_answer: Mutex<Vec<String>>,
}

/// Shell for sessions without a window. Dialog answers are scripted and
/// notifications are recorded instead of shown.
#[derive(Clone, Default)]
pub struct HeadlessShell {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HeadlessShell {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_dir: base_dir.into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Inner::default()
            }),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.inner.base_dir
    }

    /// Make every following `notify` call fail.
    pub fn fail_notifications(&self, fail: bool) {
        self.inner.fail_notifications.store(fail, Ordering::SeqCst);
    }

    pub fn script_message_box(&self, response: usize) {
        self.inner.message_box_answer.store(response, Ordering::SeqCst);
    }

    /// `None` scripts a cancelled save dialog.
    pub fn script_save_dialog(&self, path: Option<&str>) {
        *lock(&self.inner.save_answer) = path.map(str::to_string);
    }

    /// An empty list scripts a cancelled open dialog.
    pub fn script_open_dialog(&self, paths: &[&str]) {
        *lock(&self.inner.open_answer) = paths.iter().map(|p| p.to_string()).collect();
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.inner.notices).clone()
    }

    pub fn window_state(&self) -> WindowState {
        *lock(&self.inner.window)
    }
}

impl DesktopShell for HeadlessShell {
    fn notify(&self, title: &str, body: &str) -> AppResult<bool> {
        if self.inner.fail_notifications.load(Ordering::SeqCst) {
            return Err(shell_error("NOTIFICATION", "notification backend unavailable"));
        }
        lock(&self.inner.notices).push(Notice {
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(true)
    }

    fn minimize_window(&self) -> AppResult<()> {
        lock(&self.inner.window).minimized += 1;
        Ok(())
    }

    fn toggle_maximize_window(&self) -> AppResult<()> {
        let mut window = lock(&self.inner.window);
        window.maximized = !window.maximized;
        Ok(())
    }

    fn close_window(&self) -> AppResult<()> {
        lock(&self.inner.window).closed = true;
        Ok(())
    }

    fn show_message_box(
        &self,
        _options: MessageBoxOptions,
    ) -> BoxFuture<'static, AppResult<MessageBoxResponse>> {
        let response = self.inner.message_box_answer.load(Ordering::SeqCst);
        Box::pin(future::ready(Ok(MessageBoxResponse {
            response,
            checkbox_checked: false,
        })))
    }

    fn show_save_dialog(
        &self,
        _options: SaveDialogOptions,
    ) -> BoxFuture<'static, AppResult<SaveDialogResponse>> {
        let file_path = lock(&self.inner.save_answer).clone();
        Box::pin(future::ready(Ok(SaveDialogResponse {
            canceled: file_path.is_none(),
            file_path,
        })))
    }

    fn show_open_dialog(
        &self,
        _options: OpenDialogOptions,
    ) -> BoxFuture<'static, AppResult<OpenDialogResponse>> {
        let file_paths = lock(&self.inner.open_answer).clone();
        Box::pin(future::ready(Ok(OpenDialogResponse {
            canceled: file_paths.is_empty(),
            file_paths,
        })))
    }

    fn app_version(&self) -> String {
        self.inner.version.clone()
    }

    fn app_path(&self, name: AppPathName) -> AppResult<PathBuf> {
        match name {
            AppPathName::Exe => std::env::current_exe().map_err(AppError::from),
            AppPathName::UserData => Ok(self.inner.base_dir.clone()),
            other => Ok(self.inner.base_dir.join(other.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_controls_track_state() {
        let shell = HeadlessShell::new("/tmp/localdesk");
        shell.minimize_window().unwrap();
        shell.toggle_maximize_window().unwrap();
        assert!(shell.window_state().maximized);
        shell.toggle_maximize_window().unwrap();
        let state = shell.window_state();
        assert!(!state.maximized);
        assert_eq!(state.minimized, 1);
        assert!(!state.closed);
    }

    #[tokio::test]
    async fn dialogs_return_scripted_answers() {
        let shell = HeadlessShell::new("/tmp/localdesk");
        let cancelled = shell.show_save_dialog(SaveDialogOptions::default()).await.unwrap();
        assert!(cancelled.canceled);

        shell.script_save_dialog(Some("/tmp/out.json"));
        shell.script_open_dialog(&["/tmp/a.txt", "/tmp/b.txt"]);
        shell.script_message_box(1);

        let saved = shell.show_save_dialog(SaveDialogOptions::default()).await.unwrap();
        assert_eq!(saved.file_path.as_deref(), Some("/tmp/out.json"));
        let opened = shell.show_open_dialog(OpenDialogOptions::default()).await.unwrap();
        assert_eq!(opened.file_paths.len(), 2);
        assert!(!opened.canceled);
        let answer = shell.show_message_box(MessageBoxOptions::default()).await.unwrap();
        assert_eq!(answer.response, 1);
    }

    #[test]
    fn failing_notifier_reports_shell_error() {
        let shell = HeadlessShell::new("/tmp/localdesk");
        assert!(shell.notify("Hi", "there").unwrap());
        shell.fail_notifications(true);
        let err = shell.notify("Hi", "again").unwrap_err();
        assert_eq!(err.code(), "SHELL/NOTIFICATION");
        assert_eq!(shell.notices().len(), 1);
    }
}
