// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use localdesk_lib::bridge::{Bridge, BridgeRequest, BridgeResponse, FileAccess};
use localdesk_lib::config::{AppConfig, DB_FILE_NAME};
use localdesk_lib::shell::HeadlessShell;
use localdesk_lib::store::LocalStore;

#[derive(Debug, Parser)]
#[command(name = "localdesk", about = "LocalDesk desktop application", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect and edit the local key/value cache.
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Manage local users.
    #[command(subcommand)]
    Users(UsersCommand),
    /// Read and write settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Send one raw bridge request, e.g. '{"op":"get-all-from-local"}'.
    Invoke {
        request: String,
    },
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// List every cached entry in insertion order.
    List,
    /// Print the value stored under a key, or null.
    Get { key: String },
    /// Store a JSON value under a key, replacing any previous value.
    Set { key: String, value: String },
    /// Remove a key.
    Delete { key: String },
}

#[derive(Debug, Subcommand)]
enum UsersCommand {
    /// List users, newest first.
    List,
    Add { name: String, email: String },
    Remove { id: i64 },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    Get { key: String },
    Set { key: String, value: String },
}

fn main() {
    localdesk_lib::init_logging();

    let cli = Cli::parse();
    if let Some(command) = cli.command {
        match handle_cli(command) {
            Ok(code) => process::exit(code),
            Err(err) => {
                eprintln!("Error: {err:#}");
                process::exit(1);
            }
        }
    }

    tracing::debug!(target: "localdesk", "app booted");
    localdesk_lib::run()
}

fn to_request(command: Commands) -> Result<BridgeRequest> {
    let request = match command {
        Commands::Cache(CacheCommand::List) => BridgeRequest::GetAllFromLocal,
        Commands::Cache(CacheCommand::Get { key }) => BridgeRequest::GetFromLocal { key },
        Commands::Cache(CacheCommand::Set { key, value }) => {
            let value: Value = serde_json::from_str(&value)
                .with_context(|| format!("value for {key} is not valid JSON"))?;
            BridgeRequest::SaveToLocal { key, value }
        }
        Commands::Cache(CacheCommand::Delete { key }) => BridgeRequest::DeleteFromLocal { key },
        Commands::Users(UsersCommand::List) => BridgeRequest::ListUsers,
        Commands::Users(UsersCommand::Add { name, email }) => {
            BridgeRequest::CreateUser { name, email }
        }
        Commands::Users(UsersCommand::Remove { id }) => BridgeRequest::DeleteUser { id },
        Commands::Settings(SettingsCommand::Get { key }) => BridgeRequest::GetSetting { key },
        Commands::Settings(SettingsCommand::Set { key, value }) => {
            BridgeRequest::SetSetting { key, value }
        }
        Commands::Invoke { request } => {
            serde_json::from_str(&request).context("parse bridge request")?
        }
    };
    Ok(request)
}

fn handle_cli(command: Commands) -> Result<i32> {
    let request = to_request(command)?;
    let config = AppConfig::from_env()?;
    let data_dir = config
        .standalone_data_dir()
        .context("determine data directory")?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("create data directory {}", data_dir.display()))?;
    let db_path = data_dir.join(DB_FILE_NAME);

    let result = tauri::async_runtime::block_on(async {
        let store = LocalStore::open(&db_path).await?;
        let shell = HeadlessShell::new(&data_dir);
        let bridge = Bridge::new(store.clone(), Arc::new(shell), FileAccess::for_data_dir(&data_dir));
        let result = bridge.dispatch(request).await;
        store.close().await;
        result
    });

    match result {
        Ok(response) => {
            print_response(&response)?;
            Ok(0)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            localdesk_lib::flush_file_logs();
            Ok(1)
        }
    }
}

/// Print the payload of a response as pretty JSON; `accepted` prints `null`.
fn print_response(response: &BridgeResponse) -> Result<()> {
    let mut value = serde_json::to_value(response).context("serialize response")?;
    let data = value
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null);
    let rendered = serde_json::to_string_pretty(&data).context("render response")?;
    println!("{rendered}");
    Ok(())
}
