//! Append-only flat log files.

use std::path::{Path, PathBuf};

use chanlogs_core::{ChanlogError, Result, StorageKey};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Writes one line per call to `<logdir>/<key>.log`.
///
/// Callers serialize appends per key through the
/// [`WriteCoordinator`](crate::WriteCoordinator); the backend itself holds
/// no state besides the directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    logdir: PathBuf,
}

impl FileBackend {
    pub fn new(logdir: impl Into<PathBuf>) -> Self {
        Self { logdir: logdir.into() }
    }

    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.logdir.join(key.file_name())
    }

    /// Create the log directory. Run once at startup.
    pub async fn ensure_logdir(&self) -> Result<()> {
        fs::create_dir_all(&self.logdir).await.map_err(|source| ChanlogError::StorageIo {
            path: self.logdir.clone(),
            source,
        })?;
        info!(logdir = %self.logdir.display(), "Log directory ready");
        Ok(())
    }

    /// Open, append `line` plus a newline, flush and close.
    pub async fn append(&self, path: &Path, line: &str) -> Result<()> {
        let io_err =
            |source: std::io::Error| ChanlogError::StorageIo { path: path.to_path_buf(), source };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(io_err)?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        debug!(path = %path.display(), bytes = buf.len(), "Appended log line");
        Ok(())
    }
}
