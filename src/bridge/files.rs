use std::path::{Path, PathBuf};

use crate::{AppError, AppResult};

#[derive(thiserror::Error, Debug)]
pub enum FsPolicyError {
    #[error("UNC paths are not allowed")]
    UncRejected,
    #[error("Parent traversal is not allowed")]
    DotDotRejected,
    #[cfg(target_os = "windows")]
    #[error("Cross-volume paths are not allowed")]
    CrossVolume,
    #[error("Path is outside the allowed root")]
    OutsideRoot,
    #[error("Symlinks are not allowed")]
    Symlink,
    #[error("Invalid path")]
    Invalid,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FsPolicyError {
    pub fn name(&self) -> &'static str {
        match self {
            FsPolicyError::UncRejected => "UncRejected",
            FsPolicyError::DotDotRejected => "DotDotRejected",
            #[cfg(target_os = "windows")]
            FsPolicyError::CrossVolume => "CrossVolume",
            FsPolicyError::OutsideRoot => "OutsideRoot",
            FsPolicyError::Symlink => "Symlink",
            FsPolicyError::Invalid => "Invalid",
            FsPolicyError::Io(_) => "Io",
        }
    }
}

impl From<FsPolicyError> for AppError {
    fn from(err: FsPolicyError) -> Self {
        match err {
            FsPolicyError::Io(io) => AppError::from(io),
            FsPolicyError::Invalid => AppError::new("VALIDATION/INVALID_PATH", "Invalid path."),
            other => AppError::new(
                "VALIDATION/PATH_NOT_ALLOWED",
                "That location isn't allowed.",
            )
            .with_context("reason", other.name()),
        }
    }
}

/// Subdirectory of the data dir that `fs-read-file`/`fs-write-file` may touch.
/// The database, its WAL/SHM files, logs and the token store live beside it.
pub const FILES_DIR: &str = "files";

/// File reads and writes confined to a single root directory.
#[derive(Debug, Clone)]
pub struct FileAccess {
    root: PathBuf,
}

impl FileAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root the bridge uses: `<data_dir>/files`.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(FILES_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `input` against the root, rejecting `..`, UNC and paths that
    /// leave the root. Symlinks are not followed here.
    pub fn resolve(&self, input: &str) -> Result<PathBuf, FsPolicyError> {
        if input.trim().is_empty() {
            return Err(FsPolicyError::Invalid);
        }
        let norm = input.replace('\\', "/");
        if norm.starts_with("//") {
            return Err(FsPolicyError::UncRejected);
        }
        if norm.split('/').any(|seg| seg == "..") {
            return Err(FsPolicyError::DotDotRejected);
        }
        let raw_path = PathBuf::from(input);
        let candidate = if raw_path.is_absolute() {
            #[cfg(target_os = "windows")]
            {
                use std::path::Component;
                let mut base_iter = self.root.components();
                let mut path_iter = raw_path.components();
                if let (Some(Component::Prefix(bp)), Some(Component::Prefix(pp))) =
                    (base_iter.next(), path_iter.next())
                {
                    if bp.kind() != pp.kind() {
                        return Err(FsPolicyError::CrossVolume);
                    }
                }
            }
            raw_path
        } else {
            self.root.join(raw_path)
        };
        if !candidate.starts_with(&self.root) || candidate == self.root {
            return Err(FsPolicyError::OutsideRoot);
        }
        Ok(candidate)
    }

    /// Deny if any existing segment between the root and `path` is a symlink.
    /// Segments that do not exist yet end the walk.
    fn reject_symlinks(&self, path: &Path) -> Result<(), FsPolicyError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| FsPolicyError::OutsideRoot)?;
        let mut cur = self.root.clone();
        for comp in relative.components() {
            cur.push(comp.as_os_str());
            match std::fs::symlink_metadata(&cur) {
                Ok(meta) if meta.file_type().is_symlink() => return Err(FsPolicyError::Symlink),
                Ok(_) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn checked(&self, input: &str) -> AppResult<PathBuf> {
        let path = self.resolve(input)?;
        self.reject_symlinks(&path)?;
        Ok(path)
    }

    pub async fn read_to_string(&self, input: &str) -> AppResult<String> {
        let path = self.checked(input)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| AppError::from(err).with_context("path", input.to_string()))
    }

    /// Write `data`, creating missing parent directories.
    pub async fn write(&self, input: &str, data: &str) -> AppResult<()> {
        let path = self.checked(input)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| AppError::from(err).with_context("path", input.to_string()))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|err| AppError::from(err).with_context("path", input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rejects_traversal_unc_and_outside_paths() {
        let dir = tempdir().unwrap();
        let files = FileAccess::new(dir.path());

        assert!(matches!(files.resolve("../etc/passwd"), Err(FsPolicyError::DotDotRejected)));
        assert!(matches!(files.resolve("notes/../../x"), Err(FsPolicyError::DotDotRejected)));
        assert!(matches!(files.resolve("\\\\server\\share"), Err(FsPolicyError::UncRejected)));
        assert!(matches!(files.resolve(""), Err(FsPolicyError::Invalid)));
        #[cfg(unix)]
        assert!(matches!(files.resolve("/etc/passwd"), Err(FsPolicyError::OutsideRoot)));

        let inside = dir.path().join("notes/today.txt");
        assert_eq!(files.resolve(inside.to_str().unwrap()).unwrap(), inside);
        assert_eq!(files.resolve("notes/today.txt").unwrap(), inside);
    }

    #[test]
    fn policy_errors_map_to_validation_codes() {
        let err = AppError::from(FsPolicyError::DotDotRejected);
        assert_eq!(err.code(), "VALIDATION/PATH_NOT_ALLOWED");
        assert_eq!(err.context().get("reason").map(String::as_str), Some("DotDotRejected"));
    }

    #[tokio::test]
    async fn write_creates_parents_and_read_returns_text() {
        let dir = tempdir().unwrap();
        let files = FileAccess::new(dir.path());
        files.write("exports/2024/report.txt", "hello").await.unwrap();
        assert_eq!(files.read_to_string("exports/2024/report.txt").await.unwrap(), "hello");

        let missing = files.read_to_string("nope.txt").await.unwrap_err();
        assert_eq!(missing.code(), "IO/NotFound");
    }

    #[tokio::test]
    async fn data_dir_root_keeps_store_files_out_of_reach() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("local-data.db"), "db").unwrap();
        let files = FileAccess::for_data_dir(dir.path());

        assert_eq!(files.root(), dir.path().join(FILES_DIR));
        for path in ["../local-data.db", "../local-data.db-wal", "../localdesk.json", "../logs/localdesk.log"] {
            let err = files.write(path, "x").await.unwrap_err();
            assert_eq!(err.code(), "VALIDATION/PATH_NOT_ALLOWED", "{path}");
        }
        let db = dir.path().join("local-data.db");
        let err = files.write(db.to_str().unwrap(), "x").await.unwrap_err();
        assert_eq!(err.context().get("reason").map(String::as_str), Some("OutsideRoot"));
        assert_eq!(std::fs::read_to_string(&db).unwrap(), "db");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_segments_are_rejected() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let files = FileAccess::new(dir.path());
        let err = files.write("link/escape.txt", "x").await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION/PATH_NOT_ALLOWED");
        assert_eq!(err.context().get("reason").map(String::as_str), Some("Symlink"));
        assert!(!outside.path().join("escape.txt").exists());
    }
}
