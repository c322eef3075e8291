use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::shell::{
    MessageBoxOptions, MessageBoxResponse, OpenDialogOptions, OpenDialogResponse,
    SaveDialogOptions, SaveDialogResponse,
};
use crate::store::{CacheEntry, Setting, User, WriteOutcome};

/// Every operation the UI may ask of the host. Anything not listed here is
/// unreachable from the webview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "op", content = "args", rename_all = "kebab-case")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub enum BridgeRequest {
    SaveToLocal {
        key: String,
        value: Value,
    },
    GetFromLocal {
        key: String,
    },
    GetAllFromLocal,
    DeleteFromLocal {
        key: String,
    },
    ShowNotification {
        title: String,
        body: String,
    },
    MinimizeWindow,
    MaximizeWindow,
    CloseWindow,
    DbQuery {
        query: String,
        #[serde(default)]
        params: Vec<Value>,
    },
    DbRun {
        query: String,
        #[serde(default)]
        params: Vec<Value>,
    },
    CreateUser {
        name: String,
        email: String,
    },
    ListUsers,
    UpdateUser {
        #[ts(type = "number")]
        id: i64,
        name: String,
        email: String,
    },
    DeleteUser {
        #[ts(type = "number")]
        id: i64,
    },
    GetSetting {
        key: String,
    },
    SetSetting {
        key: String,
        value: String,
    },
    ShowMessageBox(MessageBoxOptions),
    ShowSaveDialog(SaveDialogOptions),
    ShowOpenDialog(OpenDialogOptions),
    GetAppVersion,
    GetAppPath {
        name: String,
    },
    FsReadFile {
        path: String,
    },
    FsWriteFile {
        path: String,
        data: String,
    },
}

impl BridgeRequest {
    /// Wire name of the operation.
    pub fn op(&self) -> &'static str {
        match self {
            BridgeRequest::SaveToLocal { .. } => "save-to-local",
            BridgeRequest::GetFromLocal { .. } => "get-from-local",
            BridgeRequest::GetAllFromLocal => "get-all-from-local",
            BridgeRequest::DeleteFromLocal { .. } => "delete-from-local",
            BridgeRequest::ShowNotification { .. } => "show-notification",
            BridgeRequest::MinimizeWindow => "minimize-window",
            BridgeRequest::MaximizeWindow => "maximize-window",
            BridgeRequest::CloseWindow => "close-window",
            BridgeRequest::DbQuery { .. } => "db-query",
            BridgeRequest::DbRun { .. } => "db-run",
            BridgeRequest::CreateUser { .. } => "create-user",
            BridgeRequest::ListUsers => "list-users",
            BridgeRequest::UpdateUser { .. } => "update-user",
            BridgeRequest::DeleteUser { .. } => "delete-user",
            BridgeRequest::GetSetting { .. } => "get-setting",
            BridgeRequest::SetSetting { .. } => "set-setting",
            BridgeRequest::ShowMessageBox(_) => "show-message-box",
            BridgeRequest::ShowSaveDialog(_) => "show-save-dialog",
            BridgeRequest::ShowOpenDialog(_) => "show-open-dialog",
            BridgeRequest::GetAppVersion => "get-app-version",
            BridgeRequest::GetAppPath { .. } => "get-app-path",
            BridgeRequest::FsReadFile { .. } => "fs-read-file",
            BridgeRequest::FsWriteFile { .. } => "fs-write-file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
#[ts(export, export_to = "../ui/src/bindings/")]
pub enum BridgeResponse {
    Write(WriteOutcome),
    Value(Option<Value>),
    Entries(Vec<CacheEntry>),
    Rows(Vec<Value>),
    Users(Vec<User>),
    User(User),
    Setting(Option<Setting>),
    Flag(bool),
    Accepted,
    MessageBox(MessageBoxResponse),
    SaveDialog(SaveDialogResponse),
    OpenDialog(OpenDialogResponse),
    Text(String),
}

impl BridgeResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeResponse::Write(_) => "write",
            BridgeResponse::Value(_) => "value",
            BridgeResponse::Entries(_) => "entries",
            BridgeResponse::Rows(_) => "rows",
            BridgeResponse::Users(_) => "users",
            BridgeResponse::User(_) => "user",
            BridgeResponse::Setting(_) => "setting",
            BridgeResponse::Flag(_) => "flag",
            BridgeResponse::Accepted => "accepted",
            BridgeResponse::MessageBox(_) => "message-box",
            BridgeResponse::SaveDialog(_) => "save-dialog",
            BridgeResponse::OpenDialog(_) => "open-dialog",
            BridgeResponse::Text(_) => "text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_use_op_and_named_args() {
        let request: BridgeRequest = serde_json::from_value(json!({
            "op": "save-to-local",
            "args": { "key": "theme", "value": { "mode": "dark" } }
        }))
        .unwrap();
        assert_eq!(
            request,
            BridgeRequest::SaveToLocal {
                key: "theme".into(),
                value: json!({ "mode": "dark" }),
            }
        );
        assert_eq!(request.op(), "save-to-local");

        let unit: BridgeRequest =
            serde_json::from_value(json!({ "op": "get-all-from-local" })).unwrap();
        assert_eq!(unit, BridgeRequest::GetAllFromLocal);

        let query: BridgeRequest = serde_json::from_value(json!({
            "op": "db-query",
            "args": { "query": "SELECT * FROM users" }
        }))
        .unwrap();
        assert!(matches!(query, BridgeRequest::DbQuery { params, .. } if params.is_empty()));
    }

    #[test]
    fn unknown_operations_do_not_parse() {
        let err = serde_json::from_value::<BridgeRequest>(json!({
            "op": "exec-shell",
            "args": { "cmd": "rm -rf /" }
        }));
        assert!(err.is_err());
    }

    #[test]
    fn op_names_match_serialized_tags() {
        let samples = [
            BridgeRequest::GetAllFromLocal,
            BridgeRequest::MaximizeWindow,
            BridgeRequest::ShowMessageBox(MessageBoxOptions::default()),
            BridgeRequest::GetAppPath { name: "home".into() },
            BridgeRequest::FsWriteFile { path: "a".into(), data: "b".into() },
            BridgeRequest::DeleteUser { id: 3 },
        ];
        for request in samples {
            let value = serde_json::to_value(&request).unwrap();
            assert_eq!(value["op"], json!(request.op()));
        }
    }

    #[test]
    fn responses_are_tagged_by_kind() {
        let value = serde_json::to_value(BridgeResponse::Value(None)).unwrap();
        assert_eq!(value, json!({ "kind": "value", "data": null }));
        let value = serde_json::to_value(BridgeResponse::Accepted).unwrap();
        assert_eq!(value["kind"], json!(BridgeResponse::Accepted.kind()));
    }
}
