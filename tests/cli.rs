#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use anyhow::Result;
use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::tempdir;

fn localdesk(data_dir: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("localdesk")?;
    cmd.env("LOCALDESK_DATA_DIR", data_dir)
        .env("RUST_LOG", "off");
    Ok(cmd)
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn cache_set_then_get_prints_the_value() -> Result<()> {
    let dir = tempdir()?;

    localdesk(dir.path())?
        .args(["cache", "set", "theme", r#"{"mode":"dark"}"#])
        .assert()
        .success();

    let output = localdesk(dir.path())?
        .args(["cache", "get", "theme"])
        .output()?;
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({ "mode": "dark" }));
    assert!(dir.path().join("local-data.db").exists());

    let missing = localdesk(dir.path())?
        .args(["cache", "get", "absent"])
        .output()?;
    assert!(missing.status.success());
    assert_eq!(stdout_json(&missing), Value::Null);
    Ok(())
}

#[test]
fn users_add_then_list() -> Result<()> {
    let dir = tempdir()?;

    localdesk(dir.path())?
        .args(["users", "add", "Ada", "ada@example.com"])
        .assert()
        .success();
    localdesk(dir.path())?
        .args(["users", "add", "Grace", "grace@example.com"])
        .assert()
        .success();

    let output = localdesk(dir.path())?.args(["users", "list"]).output()?;
    assert!(output.status.success());
    let users = stdout_json(&output);
    let emails: Vec<&str> = users
        .as_array()
        .expect("users array")
        .iter()
        .filter_map(|u| u.get("email").and_then(Value::as_str))
        .collect();
    assert_eq!(emails.len(), 2);
    assert!(emails.contains(&"ada@example.com"));
    assert!(emails.contains(&"grace@example.com"));
    Ok(())
}

#[test]
fn duplicate_email_exits_non_zero() -> Result<()> {
    let dir = tempdir()?;
    localdesk(dir.path())?
        .args(["users", "add", "Ada", "ada@example.com"])
        .assert()
        .success();

    let output = localdesk(dir.path())?
        .args(["users", "add", "Other", "ada@example.com"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("STORAGE/CONSTRAINT"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn invalid_json_value_exits_non_zero() -> Result<()> {
    let dir = tempdir()?;
    let output = localdesk(dir.path())?
        .args(["cache", "set", "k", "{not json"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn invoke_accepts_raw_bridge_requests() -> Result<()> {
    let dir = tempdir()?;
    localdesk(dir.path())?
        .args([
            "invoke",
            r#"{"op":"set-setting","args":{"key":"locale","value":"en-GB"}}"#,
        ])
        .assert()
        .success();

    let output = localdesk(dir.path())?
        .args(["settings", "get", "locale"])
        .output()?;
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output).get("value").and_then(Value::as_str),
        Some("en-GB")
    );

    localdesk(dir.path())?
        .args(["invoke", r#"{"op":"exec-shell"}"#])
        .assert()
        .failure();
    Ok(())
}
