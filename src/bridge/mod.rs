//! The named allow-list of operations the UI may invoke on the host.

use std::sync::Arc;
use std::time::Instant;

use crate::shell::{AppPathName, DesktopShell};
use crate::store::LocalStore;
use crate::util::dispatch_async_app_result;
use crate::{AppError, AppResult};

pub mod channel;
mod files;
mod request;

pub use channel::BridgeHandle;
pub use files::{FileAccess, FsPolicyError, FILES_DIR};
pub use request::{BridgeRequest, BridgeResponse};

const SAVED_TITLE: &str = "Data Saved";
const DELETED_TITLE: &str = "Data Deleted";

/// Routes each [`BridgeRequest`] to exactly one store call or shell capability.
#[derive(Clone)]
pub struct Bridge {
    store: LocalStore,
    shell: Arc<dyn DesktopShell>,
    files: FileAccess,
}

fn log_dispatch_start(op: &'static str) {
    tracing::debug!(target: "localdesk", area = "bridge", op, "ipc_enter");
}

fn log_dispatch_success(op: &'static str, start: Instant, response: &BridgeResponse) {
    tracing::info!(
        target: "localdesk",
        area = "bridge",
        op,
        kind = response.kind(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "ipc_success"
    );
}

fn log_dispatch_error(op: &'static str, start: Instant, err: &AppError) {
    let expected = err.code().starts_with("VALIDATION/") || err.is_constraint();
    // `event!` needs a constant level.
    macro_rules! emit {
        ($lvl:expr) => {
            tracing::event!(
                target: "localdesk",
                $lvl,
                area = "bridge",
                op,
                code = err.code(),
                message = err.message(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "ipc_failure"
            )
        };
    }
    if expected {
        emit!(tracing::Level::WARN);
    } else {
        emit!(tracing::Level::ERROR);
    }
}

impl Bridge {
    pub fn new(store: LocalStore, shell: Arc<dyn DesktopShell>, files: FileAccess) -> Self {
        Self { store, shell, files }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn shell(&self) -> &Arc<dyn DesktopShell> {
        &self.shell
    }

    /// Handle one request. Panics inside a handler come back as `RUNTIME/PANIC`.
    pub async fn dispatch(&self, request: BridgeRequest) -> AppResult<BridgeResponse> {
        let op = request.op();
        log_dispatch_start(op);
        let start = Instant::now();

        let bridge = self.clone();
        let result = dispatch_async_app_result(move || async move { bridge.handle(request).await })
            .await;

        match &result {
            Ok(response) => log_dispatch_success(op, start, response),
            Err(err) => log_dispatch_error(op, start, err),
        }
        result
    }

    async fn handle(&self, request: BridgeRequest) -> AppResult<BridgeResponse> {
        match request {
            BridgeRequest::SaveToLocal { key, value } => {
                let outcome = self.store.save(&key, &value).await?;
                self.notify_in_background(
                    SAVED_TITLE,
                    format!("Successfully saved \"{key}\" to local database"),
                );
                Ok(BridgeResponse::Write(outcome))
            }
            BridgeRequest::GetFromLocal { key } => {
                Ok(BridgeResponse::Value(self.store.get(&key).await?))
            }
            BridgeRequest::GetAllFromLocal => Ok(BridgeResponse::Entries(self.store.get_all().await?)),
            BridgeRequest::DeleteFromLocal { key } => {
                let outcome = self.store.delete(&key).await?;
                self.notify_in_background(
                    DELETED_TITLE,
                    format!("Successfully deleted \"{key}\" from local database"),
                );
                Ok(BridgeResponse::Write(outcome))
            }
            BridgeRequest::ShowNotification { title, body } => {
                Ok(BridgeResponse::Flag(self.shell.notify(&title, &body)?))
            }
            BridgeRequest::MinimizeWindow => {
                self.shell.minimize_window()?;
                Ok(BridgeResponse::Accepted)
            }
            BridgeRequest::MaximizeWindow => {
                self.shell.toggle_maximize_window()?;
                Ok(BridgeResponse::Accepted)
            }
            BridgeRequest::CloseWindow => {
                self.shell.close_window()?;
                Ok(BridgeResponse::Accepted)
            }
            BridgeRequest::DbQuery { query, params } => {
                Ok(BridgeResponse::Rows(self.store.query(&query, &params).await?))
            }
            BridgeRequest::DbRun { query, params } => {
                Ok(BridgeResponse::Write(self.store.run(&query, &params).await?))
            }
            BridgeRequest::CreateUser { name, email } => {
                Ok(BridgeResponse::User(self.store.create_user(&name, &email).await?))
            }
            BridgeRequest::ListUsers => Ok(BridgeResponse::Users(self.store.list_users().await?)),
            BridgeRequest::UpdateUser { id, name, email } => Ok(BridgeResponse::Write(
                self.store.update_user(id, &name, &email).await?,
            )),
            BridgeRequest::DeleteUser { id } => {
                Ok(BridgeResponse::Write(self.store.delete_user(id).await?))
            }
            BridgeRequest::GetSetting { key } => {
                Ok(BridgeResponse::Setting(self.store.get_setting(&key).await?))
            }
            BridgeRequest::SetSetting { key, value } => {
                Ok(BridgeResponse::Write(self.store.set_setting(&key, &value).await?))
            }
            BridgeRequest::ShowMessageBox(options) => Ok(BridgeResponse::MessageBox(
                self.shell.show_message_box(options).await?,
            )),
            BridgeRequest::ShowSaveDialog(options) => Ok(BridgeResponse::SaveDialog(
                self.shell.show_save_dialog(options).await?,
            )),
            BridgeRequest::ShowOpenDialog(options) => Ok(BridgeResponse::OpenDialog(
                self.shell.show_open_dialog(options).await?,
            )),
            BridgeRequest::GetAppVersion => Ok(BridgeResponse::Text(self.shell.app_version())),
            BridgeRequest::GetAppPath { name } => {
                let name: AppPathName = name.parse()?;
                let path = self.shell.app_path(name)?;
                Ok(BridgeResponse::Text(path.to_string_lossy().into_owned()))
            }
            BridgeRequest::FsReadFile { path } => {
                Ok(BridgeResponse::Text(self.files.read_to_string(&path).await?))
            }
            BridgeRequest::FsWriteFile { path, data } => {
                self.files.write(&path, &data).await?;
                Ok(BridgeResponse::Flag(true))
            }
        }
    }

    /// Fire-and-forget; a failing notifier is logged and otherwise ignored.
    fn notify_in_background(&self, title: &'static str, body: String) {
        let shell = Arc::clone(&self.shell);
        tauri::async_runtime::spawn(async move {
            if let Err(err) = shell.notify(title, &body) {
                tracing::warn!(
                    target: "localdesk",
                    event = "notification_failed",
                    title,
                    code = err.code(),
                    message = err.message()
                );
            }
        });
    }
}
