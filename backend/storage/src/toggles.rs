//! Durable per-channel logging switches.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chanlogs_core::{toggle_key, ChanlogError, Result, ToggleLookup, ToggleStore};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

/// SQLite-backed [`ToggleStore`]. Channels never toggled read as enabled.
pub struct SqliteToggleStore {
    conn: Mutex<Connection>,
}

impl SqliteToggleStore {
    /// Create or open the toggle database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ChanlogError::StorageIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path).map_err(toggle_err)?;
        Self::init(conn).inspect(|_| info!(path = %path.display(), "Toggle store opened"))
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(toggle_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chanlogs_toggles (
                 channel TEXT PRIMARY KEY,
                 enabled INTEGER NOT NULL
             );",
        )
        .map_err(toggle_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn read(&self, channel: &str) -> Result<Option<bool>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.query_row(
            "SELECT enabled FROM chanlogs_toggles WHERE channel = ?1",
            params![toggle_key(channel)],
            |row| row.get::<_, bool>(0),
        )
        .optional()
        .map_err(toggle_err)
    }
}

impl ToggleLookup for SqliteToggleStore {
    fn is_logging_enabled(&self, channel: &str) -> bool {
        match self.read(channel) {
            Ok(state) => state.unwrap_or(true),
            Err(e) => {
                warn!(channel, error = %e, "Toggle lookup failed; treating channel as enabled");
                true
            }
        }
    }
}

impl ToggleStore for SqliteToggleStore {
    fn set_logging_enabled(&self, channel: &str, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO chanlogs_toggles (channel, enabled) VALUES (?1, ?2)
             ON CONFLICT(channel) DO UPDATE SET enabled = excluded.enabled",
            params![toggle_key(channel), enabled],
        )
        .map_err(toggle_err)?;
        info!(channel, enabled, "Logging toggle updated");
        Ok(())
    }
}

fn toggle_err(e: rusqlite::Error) -> ChanlogError {
    ChanlogError::Toggle(e.to_string())
}
