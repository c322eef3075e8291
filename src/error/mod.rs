use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use anyhow::Error as AnyhowError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use sqlx::Error as SqlxError;
use std::io::Error as IoError;
use ts_rs::TS;

mod crash_id;

pub use crash_id::CrashId;

/// Marker stored in `context.status` when a remote call failed before a response arrived.
pub const CLIENT_SIDE_STATUS: &str = "client-side";

/// A structured application error that can be serialized and surfaced to the UI.
///
/// The same value travels across the bridge unchanged, so the UI sees the code the
/// store or shell produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../ui/src/bindings/")]
pub struct AppError {
    /// Machine readable error code, `AREA/DETAIL`.
    pub code: String,
    /// Human friendly message that can be shown directly to the user.
    pub message: String,
    /// Arbitrary key/value pairs that provide additional context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    #[ts(optional, type = "Record<string, string>")]
    pub context: HashMap<String, String>,
    /// Optional nested cause that preserves the error chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cause: Option<Box<AppError>>,
    /// Correlates critical failures between logs and the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub crash_id: Option<CrashId>,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Coarse classification of an [`AppError`], derived from its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O, locking or malformed persisted data.
    Storage,
    /// Uniqueness violation reported by the store. Also a storage error.
    Constraint,
    /// A bridge-backed call was made where no bridge exists.
    Environment,
    /// HTTP client or server failure.
    Remote,
    /// Rejected input (arguments, paths, SQL guard).
    Validation,
    /// The bridge answered with a response that does not fit the request.
    Bridge,
    /// Window, dialog or notification failure reported by the OS shell.
    Shell,
    /// Panics caught by the dispatch fence.
    Runtime,
    Unknown,
}

impl AppError {
    /// Default code used when an upstream error does not expose a specific code.
    pub const UNKNOWN_CODE: &'static str = "APP/UNKNOWN";
    /// Code used for errors created from free-form messages.
    pub const GENERIC_CODE: &'static str = "APP/GENERIC";
    /// Unique constraint violations raised by SQLite.
    pub const CONSTRAINT_CODE: &'static str = "STORAGE/CONSTRAINT";
    /// Stored JSON text could not be decoded.
    pub const MALFORMED_CODE: &'static str = "STORAGE/MALFORMED";
    /// Bridge-backed call attempted outside the desktop shell.
    pub const BRIDGE_UNAVAILABLE_CODE: &'static str = "ENVIRONMENT/BRIDGE_UNAVAILABLE";
    /// The bridge host went away while a call was in flight.
    pub const BRIDGE_CLOSED_CODE: &'static str = "ENVIRONMENT/BRIDGE_CLOSED";
    /// HTTP response with a non-success status.
    pub const REMOTE_HTTP_CODE: &'static str = "REMOTE/HTTP";
    /// Request failed before any HTTP response was received.
    pub const REMOTE_CLIENT_CODE: &'static str = "REMOTE/CLIENT";

    /// Construct a new application error with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            code: code.into(),
            message: message.into(),
            context: HashMap::new(),
            cause: None,
            crash_id: None,
        }
    }

    /// Error for a bridge-backed call made without a bridge.
    pub fn environment_unavailable() -> Self {
        AppError::new(
            Self::BRIDGE_UNAVAILABLE_CODE,
            "Not running in the desktop shell environment",
        )
    }

    /// Uniformly formatted remote failure. `status` is `None` for client-side failures.
    pub fn remote(status: Option<u16>, message: impl AsRef<str>) -> Self {
        match status {
            Some(status) => AppError::new(
                Self::REMOTE_HTTP_CODE,
                format!("Error Code: {status}\nMessage: {}", message.as_ref()),
            )
            .with_context("status", status.to_string()),
            None => AppError::new(
                Self::REMOTE_CLIENT_CODE,
                format!("Error: {}", message.as_ref()),
            )
            .with_context("status", CLIENT_SIDE_STATUS),
        }
    }

    /// Build an error whose user-facing message hides the details behind a crash id.
    pub fn critical(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = AppError::new(code, message);
        error.set_crash_id(CrashId::new());
        error.log_with_event("critical_failure");
        error
    }

    /// Returns the error code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the contextual metadata associated with the error.
    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    /// Returns the nested cause if one is present.
    pub fn cause(&self) -> Option<&AppError> {
        self.cause.as_deref()
    }

    pub fn crash_id(&self) -> Option<&CrashId> {
        self.crash_id.as_ref()
    }

    /// Attach a crash id and replace the message with the sanitized form.
    pub fn set_crash_id(&mut self, crash_id: CrashId) {
        self.message = format!("Something went wrong. Crash ID: {crash_id}.");
        self.crash_id = Some(crash_id);
    }

    pub fn kind(&self) -> ErrorKind {
        let code = self.code.as_str();
        if code == Self::CONSTRAINT_CODE {
            ErrorKind::Constraint
        } else if code.starts_with("STORAGE/") || code.starts_with("IO/") {
            ErrorKind::Storage
        } else if code.starts_with("ENVIRONMENT/") {
            ErrorKind::Environment
        } else if code.starts_with("REMOTE/") {
            ErrorKind::Remote
        } else if code.starts_with("VALIDATION/") {
            ErrorKind::Validation
        } else if code.starts_with("BRIDGE/") {
            ErrorKind::Bridge
        } else if code.starts_with("SHELL/") {
            ErrorKind::Shell
        } else if code.starts_with("RUNTIME/") {
            ErrorKind::Runtime
        } else {
            ErrorKind::Unknown
        }
    }

    /// True for every storage failure, constraint violations included.
    pub fn is_storage(&self) -> bool {
        matches!(self.kind(), ErrorKind::Storage | ErrorKind::Constraint)
    }

    pub fn is_constraint(&self) -> bool {
        self.kind() == ErrorKind::Constraint
    }

    /// HTTP status (or `client-side`) recorded on a remote error.
    pub fn remote_status(&self) -> Option<&str> {
        if self.kind() != ErrorKind::Remote {
            return None;
        }
        self.context.get("status").map(String::as_str)
    }

    /// Adds a contextual key/value pair to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets the nested cause for the error.
    pub fn with_cause(mut self, cause: impl Into<AppError>) -> Self {
        self.cause = Some(Box::new(cause.into()));
        self
    }

    /// Emit the error as a structured `error` event.
    pub fn log_with_event(&self, event: &'static str) {
        tracing::error!(
            target: "localdesk",
            event,
            code = %self.code,
            message = %self.message,
            crash_id = self.crash_id.as_ref().map(|id| id.to_string()),
            context = ?self.context
        );
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "[{}] {} ({:?})", self.code, self.message, self.context)
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl From<&str> for AppError {
    fn from(message: &str) -> Self {
        AppError::new(AppError::GENERIC_CODE, message)
    }
}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        AppError::new(AppError::GENERIC_CODE, message)
    }
}

impl From<AppError> for AnyhowError {
    fn from(error: AppError) -> Self {
        AnyhowError::new(error)
    }
}

impl From<AnyhowError> for AppError {
    fn from(error: AnyhowError) -> Self {
        fn convert(err: &(dyn StdError + 'static)) -> AppError {
            if let Some(app) = err.downcast_ref::<AppError>() {
                return app.clone();
            }

            let mut root = AppError::new(AppError::UNKNOWN_CODE, err.to_string());
            if let Some(source) = err.source() {
                root.cause = Some(Box::new(convert(source)));
            }
            root
        }

        convert(error.as_ref())
    }
}

impl From<IoError> for AppError {
    fn from(error: IoError) -> Self {
        let code = format!("IO/{:?}", error.kind());
        let mut app_error = AppError::new(code, error.to_string());
        if let Some(os_code) = error.raw_os_error() {
            app_error = app_error.with_context("os_code", os_code.to_string());
        }
        app_error
    }
}

impl From<SerdeJsonError> for AppError {
    fn from(error: SerdeJsonError) -> Self {
        let code = if error.is_data() {
            "JSON/DATA"
        } else if error.is_syntax() {
            "JSON/SYNTAX"
        } else if error.is_eof() {
            "JSON/EOF"
        } else if error.is_io() {
            "JSON/IO"
        } else {
            "JSON/ERROR"
        };

        let mut app_error = AppError::new(code, error.to_string());
        let line = error.line();
        if line > 0 {
            app_error = app_error.with_context("line", line.to_string());
        }
        let column = error.column();
        if column > 0 {
            app_error = app_error.with_context("column", column.to_string());
        }
        app_error
    }
}

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        match error {
            SqlxError::RowNotFound => AppError::new("STORAGE/ROW_NOT_FOUND", "Record not found"),
            SqlxError::ColumnNotFound(name) => AppError::new(
                "STORAGE/COLUMN_NOT_FOUND",
                format!("Column not found: {name}"),
            ),
            SqlxError::PoolTimedOut => AppError::new(
                "STORAGE/POOL_TIMEOUT",
                "Timed out acquiring a database connection",
            ),
            SqlxError::PoolClosed => AppError::new("STORAGE/POOL_CLOSED", "Database pool is closed"),
            SqlxError::Io(err) => AppError::from(err).with_context("source", "sqlx"),
            SqlxError::Database(db) => {
                let mut app_error = if db.is_unique_violation() {
                    AppError::new(AppError::CONSTRAINT_CODE, db.message().to_string())
                } else {
                    AppError::new("STORAGE/DATABASE", db.message().to_string())
                };
                if let Some(code) = db.code() {
                    app_error = app_error.with_context("sqlite_code", code.to_string());
                }
                if let Some(constraint) = db.constraint() {
                    app_error = app_error.with_context("constraint", constraint.to_string());
                }
                app_error
            }
            SqlxError::ColumnDecode { index, source } => {
                AppError::new("STORAGE/COLUMN_DECODE", source.to_string())
                    .with_context("column_index", index.to_string())
            }
            SqlxError::Decode(decode_err) => {
                AppError::new("STORAGE/DECODE", decode_err.to_string())
            }
            other => AppError::new("STORAGE/ERROR", other.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => AppError::remote(Some(status.as_u16()), error.to_string()),
            None => AppError::remote(None, error.to_string()),
        }
    }
}

thread_local! {
    static LAST_PANIC_CRASH_ID: RefCell<Option<CrashId>> = const { RefCell::new(None) };
}

/// Render a panic payload as text.
pub fn panic_payload(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Crash id recorded by the panic hook on this thread, if any.
pub fn take_panic_crash_id() -> Option<CrashId> {
    LAST_PANIC_CRASH_ID.with(|slot| slot.borrow_mut().take())
}

/// Log every panic with a fresh crash id, remembering it for the dispatch fence.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let crash_id = CrashId::new();
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_default();
        tracing::error!(
            target: "localdesk",
            event = "panic",
            crash_id = %crash_id,
            location = %location,
            message = %panic_payload(info.payload())
        );
        LAST_PANIC_CRASH_ID.with(|slot| *slot.borrow_mut() = Some(crash_id));
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn builds_error_with_context_and_cause() {
        let error = AppError::new("TEST/CODE", "Something went wrong")
            .with_context("key", "theme")
            .with_cause(AppError::from("inner failure"));

        assert_eq!(error.code(), "TEST/CODE");
        assert_eq!(error.context().get("key"), Some(&"theme".to_string()));
        let cause = error.cause().expect("cause present");
        assert_eq!(cause.message(), "inner failure");
        assert_eq!(cause.code(), AppError::GENERIC_CODE);
    }

    #[test]
    fn converts_anyhow_error_chain_into_nested_causes() {
        let err = (|| -> anyhow::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
                .context("failed to open database")
        })()
        .unwrap_err();

        let app_error = AppError::from(err);
        assert_eq!(app_error.code(), AppError::UNKNOWN_CODE);
        assert_eq!(app_error.message(), "failed to open database");
        let cause = app_error.cause().expect("io cause present");
        assert!(cause.message().contains("disk full"));
    }

    #[test]
    fn kinds_follow_code_prefix() {
        assert_eq!(
            AppError::new(AppError::CONSTRAINT_CODE, "dup").kind(),
            ErrorKind::Constraint
        );
        assert!(AppError::new(AppError::CONSTRAINT_CODE, "dup").is_storage());
        assert_eq!(
            AppError::new("STORAGE/DATABASE", "locked").kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            AppError::from(IoError::from_raw_os_error(2)).kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            AppError::environment_unavailable().kind(),
            ErrorKind::Environment
        );
        assert_eq!(AppError::from("free form").kind(), ErrorKind::Unknown);
    }

    #[test]
    fn remote_errors_use_uniform_message() {
        let server = AppError::remote(Some(503), "Service Unavailable");
        assert_eq!(server.kind(), ErrorKind::Remote);
        assert_eq!(server.message(), "Error Code: 503\nMessage: Service Unavailable");
        assert_eq!(server.remote_status(), Some("503"));

        let client = AppError::remote(None, "connection refused");
        assert_eq!(client.message(), "Error: connection refused");
        assert_eq!(client.remote_status(), Some(CLIENT_SIDE_STATUS));
    }

    #[test]
    fn critical_errors_hide_details_behind_crash_id() {
        let error = AppError::critical("UNIT/CRIT", "boom");
        let crash_id = error.crash_id().expect("crash id assigned").to_string();
        assert_eq!(
            error.message(),
            format!("Something went wrong. Crash ID: {crash_id}.")
        );
    }

    #[test]
    fn sqlx_row_not_found_translates_to_storage_code() {
        let app_error = AppError::from(SqlxError::RowNotFound);
        assert_eq!(app_error.code(), "STORAGE/ROW_NOT_FOUND");
        assert!(app_error.is_storage());
    }

    #[test]
    fn json_shape_is_flat_struct() {
        let error = AppError::new("VALIDATION/ARG", "nope").with_context("field", "name");
        let value = serde_json::to_value(&error).expect("serialize app error");
        assert_eq!(
            value.get("code").and_then(|v| v.as_str()),
            Some("VALIDATION/ARG")
        );
        assert_eq!(
            value
                .get("context")
                .and_then(|c| c.get("field"))
                .and_then(|v| v.as_str()),
            Some("name")
        );
        assert!(value.get("cause").is_none());
        assert!(value.get("crash_id").is_none());
    }
}
