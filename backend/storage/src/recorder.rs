//! The record pipeline: normalize → resolve → dispatch.

use std::sync::Arc;

use chanlogs_config::ChanlogsConfig;
use chanlogs_core::{ChanlogError, Normalizer, RawEvent, Result, TargetResolver, ToggleLookup};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::router::BackendRouter;
use crate::WriteOutcome;

/// Per-call tally of what happened to each canonical event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordSummary {
    pub written: usize,
    /// Backend unreachable; logged and abandoned.
    pub dropped: usize,
    /// Suppressed by PM policy or a channel toggle.
    pub filtered: usize,
}

impl RecordSummary {
    pub fn total(&self) -> usize {
        self.written + self.dropped + self.filtered
    }

    pub fn merge(&mut self, other: RecordSummary) {
        self.written += other.written;
        self.dropped += other.dropped;
        self.filtered += other.filtered;
    }
}

/// Owns the full chain from raw protocol event to stored record.
///
/// Safe to share across tasks; every call only reads the configuration
/// snapshot it was built from.
pub struct ChanLogger {
    normalizer: Normalizer,
    resolver: TargetResolver,
    router: BackendRouter,
}

impl ChanLogger {
    pub fn new(normalizer: Normalizer, resolver: TargetResolver, router: BackendRouter) -> Self {
        Self { normalizer, resolver, router }
    }

    pub fn from_config(config: &ChanlogsConfig, toggles: Arc<dyn ToggleLookup>) -> Result<Self> {
        Ok(Self::new(
            config.normalizer()?,
            TargetResolver::new(config.resolver_policy(), toggles),
            BackendRouter::from_config(config)?,
        ))
    }

    /// Startup bootstrapping for the configured backend.
    pub async fn init(&self) -> Result<()> {
        self.router.bootstrap().await
    }

    /// Record `raw` at its server time, or now.
    pub async fn record(
        &self,
        raw: &RawEvent,
        affected_targets: &[String],
    ) -> Result<RecordSummary> {
        self.record_at(raw, affected_targets, raw.time.unwrap_or_else(Utc::now)).await
    }

    pub async fn record_at(
        &self,
        raw: &RawEvent,
        affected_targets: &[String],
        captured: DateTime<Utc>,
    ) -> Result<RecordSummary> {
        let events = match self.normalizer.normalize_at(raw, affected_targets, captured) {
            Ok(events) => events,
            Err(ChanlogError::UnsupportedEvent(command)) => {
                debug!(command = %command, "Ignoring unsupported event");
                return Ok(RecordSummary::default());
            }
            Err(e) => return Err(e),
        };

        // Fan-out records are independent: a failed write for one target
        // never stops the others. The first error is returned afterwards.
        let mut summary = RecordSummary::default();
        let mut first_error = None;
        for event in &events {
            let resolution = self.resolver.resolve(event);
            if !resolution.should_persist {
                debug!(
                    channel = %event.target(),
                    event_type = %event.event_type(),
                    "Event filtered"
                );
                summary.filtered += 1;
                continue;
            }
            match self.router.dispatch(event, &resolution.key).await {
                Ok(WriteOutcome::Written) => summary.written += 1,
                Ok(WriteOutcome::Dropped) => summary.dropped += 1,
                Err(e) => {
                    warn!(channel = %event.target(), error = %e, "Failed to persist event");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanlogs_config::Backend;
    use chanlogs_core::{MemoryToggleStore, ToggleStore};
    use chrono::TimeZone;
    use std::path::Path;

    fn captured() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 21, 4, 33).unwrap()
    }

    fn raw(command: &str, sender: &str, message: &str) -> RawEvent {
        RawEvent {
            command: command.into(),
            nick: "ferris".into(),
            ident: Some("crab".into()),
            host: Some("rust-lang.org".into()),
            sender: sender.into(),
            message: message.into(),
            args: vec![sender.into(), message.into()],
            ..Default::default()
        }
    }

    fn config(logdir: &Path) -> ChanlogsConfig {
        ChanlogsConfig { logdir: logdir.to_path_buf(), by_day: false, ..Default::default() }
    }

    async fn logger(config: &ChanlogsConfig, toggles: Arc<dyn ToggleLookup>) -> ChanLogger {
        let logger = ChanLogger::from_config(config, toggles).unwrap();
        logger.init().await.unwrap();
        logger
    }

    fn read(dir: &Path, file: &str) -> String {
        std::fs::read_to_string(dir.join(file)).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_channel_message_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(&config(dir.path()), Arc::new(MemoryToggleStore::new())).await;

        let summary = logger
            .record_at(&raw("PRIVMSG", "#Rust", "hello"), &[], captured())
            .await
            .unwrap();
        assert_eq!(summary, RecordSummary { written: 1, ..Default::default() });
        assert_eq!(read(dir.path(), "#rust.log"), "[21:04:33] <ferris> hello\n");
    }

    #[tokio::test]
    async fn test_ctcp_action_is_rendered_as_action() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(&config(dir.path()), Arc::new(MemoryToggleStore::new())).await;

        logger
            .record_at(&raw("PRIVMSG", "#rust", "\x01ACTION waves\x01"), &[], captured())
            .await
            .unwrap();
        assert_eq!(read(dir.path(), "#rust.log"), "[21:04:33] * ferris waves\n");
    }

    #[tokio::test]
    async fn test_private_message_suppressed_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(&config(dir.path()), Arc::new(MemoryToggleStore::new())).await;

        let summary = logger
            .record_at(&raw("PRIVMSG", "ferris", "psst"), &[], captured())
            .await
            .unwrap();
        assert_eq!(summary, RecordSummary { filtered: 1, ..Default::default() });
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_private_message_logged_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ChanlogsConfig { privmsg: true, ..config(dir.path()) };
        let logger = logger(&cfg, Arc::new(MemoryToggleStore::new())).await;

        logger.record_at(&raw("PRIVMSG", "Ferris", "psst"), &[], captured()).await.unwrap();
        assert_eq!(read(dir.path(), "ferris.log"), "[21:04:33] <ferris> psst\n");
    }

    #[tokio::test]
    async fn test_toggle_suppresses_until_reenabled() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ChanlogsConfig { allow_toggle: true, ..config(dir.path()) };
        let toggles = Arc::new(MemoryToggleStore::new());
        let logger = logger(&cfg, toggles.clone()).await;

        toggles.set_logging_enabled("#rust", false).unwrap();
        let off = logger
            .record_at(&raw("PRIVMSG", "#rust", "secret"), &[], captured())
            .await
            .unwrap();
        assert_eq!(off.filtered, 1);
        assert_eq!(read(dir.path(), "#rust.log"), "");

        toggles.set_logging_enabled("#rust", true).unwrap();
        let on = logger
            .record_at(&raw("PRIVMSG", "#rust", "public"), &[], captured())
            .await
            .unwrap();
        assert_eq!(on.written, 1);
        assert_eq!(read(dir.path(), "#rust.log"), "[21:04:33] <ferris> public\n");
    }

    #[tokio::test]
    async fn test_toggles_ignored_without_allow_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let toggles = Arc::new(MemoryToggleStore::new());
        toggles.set_logging_enabled("#rust", false).unwrap();
        let logger = logger(&config(dir.path()), toggles).await;

        let summary = logger
            .record_at(&raw("PRIVMSG", "#rust", "hi"), &[], captured())
            .await
            .unwrap();
        assert_eq!(summary.written, 1);
    }

    #[tokio::test]
    async fn test_quit_fans_out_to_each_channel() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(&config(dir.path()), Arc::new(MemoryToggleStore::new())).await;

        let mut quit = raw("QUIT", "ferris", "Ping timeout");
        quit.args = vec!["Ping timeout".into()];
        let affected = vec!["#a".to_string(), "#b".to_string()];
        let summary = logger.record_at(&quit, &affected, captured()).await.unwrap();

        assert_eq!(summary.written, 2);
        let expected = "[21:04:33] *** Quits: ferris (crab@rust-lang.org) (Ping timeout)\n";
        assert_eq!(read(dir.path(), "#a.log"), expected);
        assert_eq!(read(dir.path(), "#b.log"), expected);
    }

    #[tokio::test]
    async fn test_failed_fan_out_target_does_not_block_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(&config(dir.path()), Arc::new(MemoryToggleStore::new())).await;
        std::fs::create_dir(dir.path().join("#a.log")).unwrap();

        let mut quit = raw("QUIT", "ferris", "Ping timeout");
        quit.args = vec!["Ping timeout".into()];
        let affected = vec!["#a".to_string(), "#b".to_string()];
        let err = logger.record_at(&quit, &affected, captured()).await.unwrap_err();

        assert!(matches!(err, ChanlogError::StorageIo { .. }));
        assert_eq!(
            read(dir.path(), "#b.log"),
            "[21:04:33] *** Quits: ferris (crab@rust-lang.org) (Ping timeout)\n"
        );
    }

    #[tokio::test]
    async fn test_unsupported_event_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(&config(dir.path()), Arc::new(MemoryToggleStore::new())).await;

        let summary = logger
            .record_at(&raw("PING", "", "irc.libera.chat"), &[], captured())
            .await
            .unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[tokio::test]
    async fn test_daily_partition_uses_local_date() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = ChanlogsConfig { by_day: true, ..config(dir.path()) };
        cfg.channel_timezones.insert("#tokyo".into(), "+09:00".into());
        let logger = logger(&cfg, Arc::new(MemoryToggleStore::new())).await;

        logger.record_at(&raw("PRIVMSG", "#tokyo", "ohayo"), &[], captured()).await.unwrap();
        logger.record_at(&raw("PRIVMSG", "#utc", "evening"), &[], captured()).await.unwrap();
        assert_eq!(read(dir.path(), "#tokyo-2024-05-02.log"), "[06:04:33] <ferris> ohayo\n");
        assert_eq!(read(dir.path(), "#utc-2024-05-01.log"), "[21:04:33] <ferris> evening\n");
    }

    #[tokio::test]
    async fn test_database_backend_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("chanlogs.db");
        let cfg = ChanlogsConfig {
            backend: Backend::Database,
            connection_string: Some(db_path.display().to_string()),
            network: "libera".into(),
            ..config(dir.path())
        };
        let logger = logger(&cfg, Arc::new(MemoryToggleStore::new())).await;

        let mut join = raw("JOIN", "#rust", "");
        join.args = vec!["#rust".into()];
        let summary = logger.record_at(&join, &[], captured()).await.unwrap();
        assert_eq!(summary.written, 1);

        let conn = rusqlite::Connection::open(&db_path).unwrap();
        let (network, kind): (String, String) = conn
            .query_row("SELECT network, type FROM chanlogs WHERE channel = '#rust'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(network, "libera");
        assert_eq!(kind, "JOIN");
    }
}
