#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use localdesk_lib::bridge::{Bridge, BridgeRequest, BridgeResponse, FileAccess, FILES_DIR};
use localdesk_lib::config::DB_FILE_NAME;
use localdesk_lib::shell::{HeadlessShell, MessageBoxOptions, Notice, OpenDialogOptions};
use localdesk_lib::store::LocalStore;
use localdesk_lib::ErrorKind;
use serde_json::json;
use tempfile::{tempdir, TempDir};

struct Harness {
    _dir: TempDir,
    shell: HeadlessShell,
    bridge: Bridge,
}

async fn harness() -> Harness {
    let dir = tempdir().unwrap();
    let shell = HeadlessShell::new(dir.path());
    let store = LocalStore::in_memory().await.unwrap();
    let bridge = Bridge::new(store, Arc::new(shell.clone()), FileAccess::for_data_dir(dir.path()));
    Harness {
        _dir: dir,
        shell,
        bridge,
    }
}

async fn wait_for_notices(shell: &HeadlessShell, count: usize) -> Vec<Notice> {
    for _ in 0..200 {
        let notices = shell.notices();
        if notices.len() >= count {
            return notices;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    shell.notices()
}

#[tokio::test]
async fn save_and_delete_send_notifications() {
    let h = harness().await;
    h.bridge
        .dispatch(BridgeRequest::SaveToLocal {
            key: "theme".into(),
            value: json!("dark"),
        })
        .await
        .unwrap();
    h.bridge
        .dispatch(BridgeRequest::DeleteFromLocal {
            key: "theme".into(),
        })
        .await
        .unwrap();

    let notices = wait_for_notices(&h.shell, 2).await;
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].title, "Data Saved");
    assert_eq!(notices[0].body, "Successfully saved \"theme\" to local database");
    assert_eq!(notices[1].title, "Data Deleted");
}

#[tokio::test]
async fn failing_notifier_does_not_fail_the_save() {
    let h = harness().await;
    h.shell.fail_notifications(true);

    let response = h
        .bridge
        .dispatch(BridgeRequest::SaveToLocal {
            key: "k".into(),
            value: json!(1),
        })
        .await
        .unwrap();
    assert!(matches!(response, BridgeResponse::Write(outcome) if outcome.changes == 1));
    assert_eq!(
        h.bridge
            .dispatch(BridgeRequest::GetFromLocal { key: "k".into() })
            .await
            .unwrap(),
        BridgeResponse::Value(Some(json!(1)))
    );
}

#[tokio::test]
async fn explicit_notification_failure_is_a_shell_error() {
    let h = harness().await;
    h.shell.fail_notifications(true);
    let err = h
        .bridge
        .dispatch(BridgeRequest::ShowNotification {
            title: "Hi".into(),
            body: "there".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shell);
}

#[tokio::test]
async fn duplicate_email_propagates_as_constraint() {
    let h = harness().await;
    let create = || BridgeRequest::CreateUser {
        name: "Ada".into(),
        email: "ada@example.com".into(),
    };
    let first = h.bridge.dispatch(create()).await.unwrap();
    assert!(matches!(first, BridgeResponse::User(ref user) if user.email == "ada@example.com"));

    let err = h.bridge.dispatch(create()).await.unwrap_err();
    assert!(err.is_constraint());

    let users = h.bridge.dispatch(BridgeRequest::ListUsers).await.unwrap();
    assert!(matches!(users, BridgeResponse::Users(users) if users.len() == 1));
}

#[tokio::test]
async fn db_query_reads_allowed_tables() {
    let h = harness().await;
    h.bridge
        .dispatch(BridgeRequest::SetSetting {
            key: "locale".into(),
            value: "en".into(),
        })
        .await
        .unwrap();

    let rows = h
        .bridge
        .dispatch(BridgeRequest::DbQuery {
            query: "SELECT key, value FROM settings WHERE key = ?".into(),
            params: vec![json!("locale")],
        })
        .await
        .unwrap();
    assert_eq!(
        rows,
        BridgeResponse::Rows(vec![json!({ "key": "locale", "value": "en" })])
    );
}

#[tokio::test]
async fn db_query_rejects_writes_and_foreign_tables() {
    let h = harness().await;
    for query in [
        "DELETE FROM users",
        "SELECT * FROM sqlite_master",
        "SELECT 1; DROP TABLE users",
        "SELECT * FROM secrets",
    ] {
        let err = h
            .bridge
            .dispatch(BridgeRequest::DbQuery {
                query: query.into(),
                params: Vec::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION/SQL_REJECTED", "query: {query}");
    }

    let err = h
        .bridge
        .dispatch(BridgeRequest::DbRun {
            query: "DROP TABLE users".into(),
            params: Vec::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn db_run_reports_changes() {
    let h = harness().await;
    let response = h
        .bridge
        .dispatch(BridgeRequest::DbRun {
            query: "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)".into(),
            params: vec![json!("a"), json!("1"), json!(0)],
        })
        .await
        .unwrap();
    assert!(matches!(response, BridgeResponse::Write(outcome) if outcome.changes == 1));
}

#[tokio::test]
async fn file_access_stays_inside_the_data_dir() {
    let h = harness().await;
    let written = h
        .bridge
        .dispatch(BridgeRequest::FsWriteFile {
            path: "exports/out.txt".into(),
            data: "hello".into(),
        })
        .await
        .unwrap();
    assert_eq!(written, BridgeResponse::Flag(true));

    let read = h
        .bridge
        .dispatch(BridgeRequest::FsReadFile {
            path: "exports/out.txt".into(),
        })
        .await
        .unwrap();
    assert_eq!(read, BridgeResponse::Text("hello".into()));

    let outside = std::env::temp_dir().join("localdesk-outside.txt");
    for path in ["../escape.txt", outside.to_str().unwrap(), ""] {
        let err = h
            .bridge
            .dispatch(BridgeRequest::FsReadFile { path: path.into() })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "path: {path:?}");
    }
}

#[tokio::test]
async fn dialogs_return_scripted_answers() {
    let h = harness().await;
    h.shell.script_message_box(1);
    h.shell.script_open_dialog(&["/tmp/a.txt", "/tmp/b.txt"]);

    let answer = h
        .bridge
        .dispatch(BridgeRequest::ShowMessageBox(MessageBoxOptions {
            message: "Continue?".into(),
            buttons: vec!["Yes".into(), "No".into()],
            ..MessageBoxOptions::default()
        }))
        .await
        .unwrap();
    assert!(matches!(answer, BridgeResponse::MessageBox(r) if r.response == 1));

    let opened = h
        .bridge
        .dispatch(BridgeRequest::ShowOpenDialog(OpenDialogOptions::default()))
        .await
        .unwrap();
    assert!(matches!(
        opened,
        BridgeResponse::OpenDialog(r) if !r.canceled && r.file_paths.len() == 2
    ));
}

#[tokio::test]
async fn app_paths_resolve_against_the_shell() {
    let h = harness().await;
    let user_data = h
        .bridge
        .dispatch(BridgeRequest::GetAppPath {
            name: "userData".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        user_data,
        BridgeResponse::Text(h.shell.base_dir().to_string_lossy().into_owned())
    );

    let version = h.bridge.dispatch(BridgeRequest::GetAppVersion).await.unwrap();
    assert_eq!(version, BridgeResponse::Text(env!("CARGO_PKG_VERSION").into()));
}

#[tokio::test]
async fn file_writes_cannot_reach_the_database_file() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join(DB_FILE_NAME);
    let store = LocalStore::open(&db_path).await.unwrap();
    store.save("kept", &json!("still here")).await.unwrap();
    let shell = HeadlessShell::new(dir.path());
    let bridge = Bridge::new(
        store.clone(),
        Arc::new(shell),
        FileAccess::for_data_dir(dir.path()),
    );

    for path in [
        format!("../{DB_FILE_NAME}"),
        format!("../{DB_FILE_NAME}-wal"),
        db_path.to_string_lossy().into_owned(),
    ] {
        let err = bridge
            .dispatch(BridgeRequest::FsWriteFile {
                path: path.clone(),
                data: "garbage".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION/PATH_NOT_ALLOWED", "path: {path}");
    }

    // A bare name lands in the files directory, never on the live database.
    bridge
        .dispatch(BridgeRequest::FsWriteFile {
            path: DB_FILE_NAME.into(),
            data: "garbage".into(),
        })
        .await
        .unwrap();
    assert!(dir.path().join(FILES_DIR).join(DB_FILE_NAME).is_file());
    assert_eq!(store.get("kept").await.unwrap(), Some(json!("still here")));
    store.close().await;
}
