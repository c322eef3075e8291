//! Typed facade the UI layer uses to reach the bridge.
//!
//! A [`BridgeClient`] built without a transport still answers every call, but
//! only with an `ENVIRONMENT/BRIDGE_UNAVAILABLE` error; nothing is sent.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::bridge::{Bridge, BridgeHandle, BridgeRequest, BridgeResponse};
use crate::shell::{
    MessageBoxOptions, MessageBoxResponse, OpenDialogOptions, OpenDialogResponse,
    SaveDialogOptions, SaveDialogResponse,
};
use crate::store::{CacheEntry, Setting, User, WriteOutcome};
use crate::{AppError, AppResult};

pub const UNEXPECTED_RESPONSE_CODE: &str = "BRIDGE/UNEXPECTED_RESPONSE";

/// Carries one request to the host and brings back its reply.
pub trait BridgeTransport: Send + Sync {
    fn send(&self, request: BridgeRequest) -> BoxFuture<'_, AppResult<BridgeResponse>>;
}

impl BridgeTransport for BridgeHandle {
    fn send(&self, request: BridgeRequest) -> BoxFuture<'_, AppResult<BridgeResponse>> {
        Box::pin(self.call(request))
    }
}

impl BridgeTransport for Bridge {
    fn send(&self, request: BridgeRequest) -> BoxFuture<'_, AppResult<BridgeResponse>> {
        Box::pin(self.dispatch(request))
    }
}

fn unexpected(op: &'static str, response: &BridgeResponse) -> AppError {
    AppError::new(
        UNEXPECTED_RESPONSE_CODE,
        "The bridge answered with a response that does not fit the request",
    )
    .with_context("op", op)
    .with_context("kind", response.kind())
}

macro_rules! expect_response {
    ($response:expr, $op:expr, $variant:ident) => {
        match $response {
            BridgeResponse::$variant(inner) => Ok(inner),
            other => Err(unexpected($op, &other)),
        }
    };
}

#[derive(Clone, Default)]
pub struct BridgeClient {
    transport: Option<Arc<dyn BridgeTransport>>,
}

impl BridgeClient {
    pub fn connected(transport: Arc<dyn BridgeTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// A client for a page loaded outside the desktop shell.
    pub fn detached() -> Self {
        Self { transport: None }
    }

    pub fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    async fn call(&self, request: BridgeRequest) -> AppResult<BridgeResponse> {
        let op = request.op();
        let Some(transport) = self.transport.as_ref() else {
            tracing::warn!(target: "localdesk", event = "bridge_unavailable", op);
            return Err(AppError::environment_unavailable().with_context("op", op));
        };
        transport.send(request).await
    }

    async fn call_accepted(&self, request: BridgeRequest) -> AppResult<()> {
        let op = request.op();
        match self.call(request).await? {
            BridgeResponse::Accepted => Ok(()),
            other => Err(unexpected(op, &other)),
        }
    }

    pub async fn save_to_local(&self, key: &str, value: &Value) -> AppResult<WriteOutcome> {
        let response = self
            .call(BridgeRequest::SaveToLocal {
                key: key.to_string(),
                value: value.clone(),
            })
            .await?;
        expect_response!(response, "save-to-local", Write)
    }

    pub async fn get_from_local(&self, key: &str) -> AppResult<Option<Value>> {
        let response = self
            .call(BridgeRequest::GetFromLocal {
                key: key.to_string(),
            })
            .await?;
        expect_response!(response, "get-from-local", Value)
    }

    pub async fn get_all_from_local(&self) -> AppResult<Vec<CacheEntry>> {
        let response = self.call(BridgeRequest::GetAllFromLocal).await?;
        expect_response!(response, "get-all-from-local", Entries)
    }

    pub async fn delete_from_local(&self, key: &str) -> AppResult<WriteOutcome> {
        let response = self
            .call(BridgeRequest::DeleteFromLocal {
                key: key.to_string(),
            })
            .await?;
        expect_response!(response, "delete-from-local", Write)
    }

    /// `Ok(false)` when the host cannot show notifications.
    pub async fn show_notification(&self, title: &str, body: &str) -> AppResult<bool> {
        let response = self
            .call(BridgeRequest::ShowNotification {
                title: title.to_string(),
                body: body.to_string(),
            })
            .await?;
        expect_response!(response, "show-notification", Flag)
    }

    pub async fn minimize_window(&self) -> AppResult<()> {
        self.call_accepted(BridgeRequest::MinimizeWindow).await
    }

    pub async fn maximize_window(&self) -> AppResult<()> {
        self.call_accepted(BridgeRequest::MaximizeWindow).await
    }

    pub async fn close_window(&self) -> AppResult<()> {
        self.call_accepted(BridgeRequest::CloseWindow).await
    }

    pub async fn db_query(&self, query: &str, params: Vec<Value>) -> AppResult<Vec<Value>> {
        let response = self
            .call(BridgeRequest::DbQuery {
                query: query.to_string(),
                params,
            })
            .await?;
        expect_response!(response, "db-query", Rows)
    }

    pub async fn db_run(&self, query: &str, params: Vec<Value>) -> AppResult<WriteOutcome> {
        let response = self
            .call(BridgeRequest::DbRun {
                query: query.to_string(),
                params,
            })
            .await?;
        expect_response!(response, "db-run", Write)
    }

    pub async fn create_user(&self, name: &str, email: &str) -> AppResult<User> {
        let response = self
            .call(BridgeRequest::CreateUser {
                name: name.to_string(),
                email: email.to_string(),
            })
            .await?;
        expect_response!(response, "create-user", User)
    }

    pub async fn get_users(&self) -> AppResult<Vec<User>> {
        let response = self.call(BridgeRequest::ListUsers).await?;
        expect_response!(response, "list-users", Users)
    }

    pub async fn update_user(&self, id: i64, name: &str, email: &str) -> AppResult<WriteOutcome> {
        let response = self
            .call(BridgeRequest::UpdateUser {
                id,
                name: name.to_string(),
                email: email.to_string(),
            })
            .await?;
        expect_response!(response, "update-user", Write)
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<WriteOutcome> {
        let response = self.call(BridgeRequest::DeleteUser { id }).await?;
        expect_response!(response, "delete-user", Write)
    }

    pub async fn get_setting(&self, key: &str) -> AppResult<Option<Setting>> {
        let response = self
            .call(BridgeRequest::GetSetting {
                key: key.to_string(),
            })
            .await?;
        expect_response!(response, "get-setting", Setting)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> AppResult<WriteOutcome> {
        let response = self
            .call(BridgeRequest::SetSetting {
                key: key.to_string(),
                value: value.to_string(),
            })
            .await?;
        expect_response!(response, "set-setting", Write)
    }

    pub async fn show_message_box(
        &self,
        options: MessageBoxOptions,
    ) -> AppResult<MessageBoxResponse> {
        let response = self.call(BridgeRequest::ShowMessageBox(options)).await?;
        expect_response!(response, "show-message-box", MessageBox)
    }

    pub async fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> AppResult<SaveDialogResponse> {
        let response = self.call(BridgeRequest::ShowSaveDialog(options)).await?;
        expect_response!(response, "show-save-dialog", SaveDialog)
    }

    pub async fn show_open_dialog(
        &self,
        options: OpenDialogOptions,
    ) -> AppResult<OpenDialogResponse> {
        let response = self.call(BridgeRequest::ShowOpenDialog(options)).await?;
        expect_response!(response, "show-open-dialog", OpenDialog)
    }

    pub async fn get_app_version(&self) -> AppResult<String> {
        let response = self.call(BridgeRequest::GetAppVersion).await?;
        expect_response!(response, "get-app-version", Text)
    }

    pub async fn get_app_path(&self, name: &str) -> AppResult<String> {
        let response = self
            .call(BridgeRequest::GetAppPath {
                name: name.to_string(),
            })
            .await?;
        expect_response!(response, "get-app-path", Text)
    }

    pub async fn read_file(&self, path: &str) -> AppResult<String> {
        let response = self
            .call(BridgeRequest::FsReadFile {
                path: path.to_string(),
            })
            .await?;
        expect_response!(response, "fs-read-file", Text)
    }

    pub async fn write_file(&self, path: &str, data: &str) -> AppResult<bool> {
        let response = self
            .call(BridgeRequest::FsWriteFile {
                path: path.to_string(),
                data: data.to_string(),
            })
            .await?;
        expect_response!(response, "fs-write-file", Flag)
    }
}
