use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use once_cell::sync::OnceCell;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::AppResult;

pub const ENV_LOG: &str = "LOCALDESK_LOG";
const DEFAULT_FILTER: &str = "localdesk=info,sqlx=warn";
pub const LOG_FILE_NAME: &str = "localdesk.log";
const MAX_LOG_BYTES: usize = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static FILE_SINK: OnceCell<Mutex<FileRotate<AppendCount>>> = OnceCell::new();

/// Writer for the file layer. Drops output until [`init_file_logging`] attaches a file.
struct FileSinkWriter;

impl Write for FileSinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match FILE_SINK.get() {
            Some(sink) => sink.lock().unwrap_or_else(|e| e.into_inner()).write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match FILE_SINK.get() {
            Some(sink) => sink.lock().unwrap_or_else(|e| e.into_inner()).flush(),
            None => Ok(()),
        }
    }
}

/// Install the global subscriber: JSON lines on stderr plus the (initially detached)
/// rotating file layer. Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_log::LogTracer::init();

    let filter =
        EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(io::stderr);
    let file_layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_target(true)
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(|| FileSinkWriter);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Attach `<logs_dir>/localdesk.log` to the file layer. Only the first call wins.
pub fn init_file_logging(logs_dir: &Path) -> AppResult<PathBuf> {
    std::fs::create_dir_all(logs_dir)
        .map_err(|err| crate::AppError::from(err).with_context("path", logs_dir.display().to_string()))?;
    let path = logs_dir.join(LOG_FILE_NAME);
    let _ = FILE_SINK.get_or_init(|| {
        Mutex::new(FileRotate::new(
            &path,
            AppendCount::new(MAX_LOG_FILES),
            ContentLimit::Bytes(MAX_LOG_BYTES),
            Compression::None,
            #[cfg(unix)]
            None,
        ))
    });
    tracing::info!(target: "localdesk", event = "file_logging_ready", path = %path.display());
    Ok(path)
}

pub fn flush_file_logs() {
    let _ = FileSinkWriter.flush();
}
