//! SQLite-backed event rows.
//!
//! Every insert opens its own connection, writes one row inside a
//! transaction and closes again. There is no per-key locking on this path;
//! concurrent inserts are ordered by SQLite's own write lock.

use std::time::Duration;

use chanlogs_core::{CanonicalEvent, ChanlogError, Result};
use chanlogs_logging::redact_credentials;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::WriteOutcome;

const SQLITE_SCHEME: &str = "sqlite://";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    PRAGMA journal_mode=WAL;
    CREATE TABLE IF NOT EXISTS chanlogs (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        network   TEXT,
        channel   TEXT,
        type      TEXT,
        message   TEXT,
        nick      TEXT,
        ident     TEXT,
        host      TEXT,
        sender    TEXT,
        timestamp TEXT,
        args      TEXT,
        tags      TEXT,
        intent    TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_chanlogs_network_channel ON chanlogs(network, channel);";

const INSERT: &str = "INSERT INTO chanlogs
    (network, channel, type, message, nick, ident, host, sender, timestamp, args, tags, intent)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

/// Column values for one row, owned so they can move onto a blocking thread.
#[derive(Debug)]
struct Row {
    network: String,
    channel: String,
    event_type: &'static str,
    message: String,
    nick: String,
    ident: Option<String>,
    host: Option<String>,
    sender: String,
    timestamp: String,
    args: String,
    tags: String,
    intent: Option<String>,
}

impl Row {
    fn from_event(network: &str, event: &CanonicalEvent) -> Result<Self> {
        Ok(Self {
            network: network.to_string(),
            channel: event.target().to_string(),
            event_type: event.event_type().as_str(),
            message: event.message().to_string(),
            nick: event.nick().to_string(),
            ident: event.ident().map(str::to_string),
            host: event.host().map(str::to_string),
            sender: event.sender().to_string(),
            timestamp: event.timestamp().to_rfc3339(),
            args: serde_json::to_string(event.args()).map_err(anyhow::Error::from)?,
            tags: serde_json::to_string(event.tags()).map_err(anyhow::Error::from)?,
            intent: event.intent().map(str::to_string),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseBackend {
    /// Path or `file:` URI handed to SQLite.
    location: String,
    network: String,
}

impl DatabaseBackend {
    /// `connection_string` is a filesystem path, optionally prefixed with
    /// `sqlite://`, or a `file:` URI.
    pub fn new(connection_string: &str, network: impl Into<String>) -> Self {
        let location = connection_string
            .trim()
            .strip_prefix(SQLITE_SCHEME)
            .unwrap_or(connection_string.trim())
            .to_string();
        Self { location, network: network.into() }
    }

    /// Create the table and index if absent. Safe to run on every startup.
    pub async fn provision_schema(&self) -> Result<()> {
        let location = self.location.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            let conn = Connection::open_with_flags(&location, flags).map_err(|e| {
                ChanlogError::BackendUnavailable(format!("{}: {e}", redact_credentials(&location)))
            })?;
            conn.execute_batch(SCHEMA).map_err(db_err)?;
            info!(database = %redact_credentials(&location), "Database schema ready");
            Ok(())
        })
        .await
        .map_err(|e| ChanlogError::Database(e.to_string()))?
    }

    /// Insert one event as a row.
    ///
    /// A database that cannot be opened is logged and the event abandoned:
    /// the call still succeeds with [`WriteOutcome::Dropped`]. Failures after
    /// the connection is up are returned as [`ChanlogError::Database`].
    pub async fn insert(&self, event: &CanonicalEvent) -> Result<WriteOutcome> {
        let row = Row::from_event(&self.network, event)?;
        let location = self.location.clone();
        tokio::task::spawn_blocking(move || insert_row(&location, row))
            .await
            .map_err(|e| ChanlogError::Database(e.to_string()))?
    }
}

fn insert_row(location: &str, row: Row) -> Result<WriteOutcome> {
    let mut conn = match connect(location) {
        Ok(conn) => conn,
        Err(e) => {
            warn!(
                database = %redact_credentials(location),
                channel = %row.channel,
                error = %e,
                "Database unavailable; dropping event"
            );
            return Ok(WriteOutcome::Dropped);
        }
    };

    let tx = conn.transaction().map_err(db_err)?;
    tx.execute(
        INSERT,
        params![
            row.network,
            row.channel,
            row.event_type,
            row.message,
            row.nick,
            row.ident,
            row.host,
            row.sender,
            row.timestamp,
            row.args,
            row.tags,
            row.intent,
        ],
    )
    .map_err(db_err)?;
    tx.commit().map_err(db_err)?;

    debug!(channel = %row.channel, event_type = row.event_type, "Inserted event row");
    Ok(WriteOutcome::Written)
}

/// Open without create permission, so a missing database is a connection
/// failure rather than a fresh empty file.
fn connect(location: &str) -> rusqlite::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(location, flags)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn db_err(e: rusqlite::Error) -> ChanlogError {
    ChanlogError::Database(e.to_string())
}
