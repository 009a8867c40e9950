//! `chanlogs replay`: drive the record pipeline from raw IRC lines.
//!
//! Each line is parsed, fanned out to the channels the roster says are
//! affected, recorded, checked for admin commands, and finally folded into
//! the roster so later QUIT/NICK lines see the right membership.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::{JoinError, JoinSet};
use tracing::{info, warn};

use chanlogs_channels::{parse_line, Roster};
use chanlogs_commands::{build_default_dispatcher, CommandContext, CommandDispatcher};
use chanlogs_config::ChanlogsConfig;
use chanlogs_core::RawEvent;
use chanlogs_storage::{ChanLogger, RecordSummary};

use crate::open_toggles;
use crate::terminal_output::{note_success, note_warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub lines: usize,
    pub skipped: usize,
    pub failed: usize,
    pub commands: usize,
    pub records: RecordSummary,
}

pub async fn run(config: &ChanlogsConfig, input: Option<&Path>, concurrent: bool) -> Result<()> {
    let stats = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            replay(config, BufReader::new(file), concurrent).await?
        }
        None => replay(config, BufReader::new(tokio::io::stdin()), concurrent).await?,
    };

    if stats.failed > 0 {
        note_warn(&format!("{} event(s) failed to record; see the log for details", stats.failed));
    }
    note_success(&format!(
        "Replayed {} line(s): {} written, {} dropped, {} filtered, {} skipped, {} command(s)",
        stats.lines,
        stats.records.written,
        stats.records.dropped,
        stats.records.filtered,
        stats.skipped,
        stats.commands,
    ));
    Ok(())
}

/// Replay every line of `reader` through a pipeline built from `config`.
pub async fn replay<R>(config: &ChanlogsConfig, reader: R, concurrent: bool) -> Result<ReplayStats>
where
    R: AsyncBufRead + Unpin,
{
    let toggles = open_toggles(config)?;
    let logger = Arc::new(ChanLogger::from_config(config, toggles.lookup)?);
    logger.init().await?;
    let dispatcher =
        build_default_dispatcher(toggles.store, config.command_prefix.clone(), config.allow_toggle);

    let mut replay = Replay {
        logger,
        dispatcher,
        prefix: config.command_prefix.clone(),
        roster: Roster::new(),
        pending: JoinSet::new(),
        stats: ReplayStats::default(),
        concurrent,
    };

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        replay.feed(&line).await?;
    }
    replay.drain().await;

    info!(stats = ?replay.stats, "Replay finished");
    Ok(replay.stats)
}

// ---------------------------------------------------------------------------
// Replay state
// ---------------------------------------------------------------------------

struct Replay {
    logger: Arc<ChanLogger>,
    dispatcher: CommandDispatcher,
    prefix: String,
    roster: Roster,
    pending: JoinSet<chanlogs_core::Result<RecordSummary>>,
    stats: ReplayStats,
    concurrent: bool,
}

impl Replay {
    async fn feed(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        self.stats.lines += 1;

        let raw = match parse_line(line) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Skipping unparsable line");
                self.stats.skipped += 1;
                return Ok(());
            }
        };

        let affected = match raw.command.as_str() {
            "QUIT" => self.roster.affected_channels(&raw.nick, None),
            "NICK" => self.roster.affected_channels(&raw.nick, Some(&raw.sender)),
            _ => Vec::new(),
        };

        if self.concurrent {
            let logger = self.logger.clone();
            let event = raw.clone();
            self.pending.spawn(async move { logger.record(&event, &affected).await });
            self.reap();
        } else {
            let outcome = self.logger.record(&raw, &affected).await;
            self.tally(outcome);
        }

        if raw.command == "PRIVMSG" && raw.message.trim_start().starts_with(self.prefix.as_str()) {
            // Toggles must observe every earlier line before the command runs.
            self.drain().await;
            self.command(&raw).await?;
        }

        self.roster.apply(&raw);
        Ok(())
    }

    async fn command(&mut self, raw: &RawEvent) -> Result<()> {
        let ctx = CommandContext {
            channel: raw.sender.clone(),
            sender: raw.nick.clone(),
            privilege: self.roster.privilege(&raw.sender, &raw.nick),
        };
        if let Some(reply) = self.dispatcher.handle_text(&ctx, &raw.message).await? {
            self.stats.commands += 1;
            let to = if reply.private { &ctx.sender } else { &ctx.channel };
            println!("-> {to}: {}", reply.text);
        }
        Ok(())
    }

    fn tally(&mut self, outcome: chanlogs_core::Result<RecordSummary>) {
        match outcome {
            Ok(summary) => self.stats.records.merge(summary),
            Err(e) => {
                warn!(error = %e, "Failed to record event");
                self.stats.failed += 1;
            }
        }
    }

    /// Collect tasks that already finished without waiting on the rest.
    fn reap(&mut self) {
        while let Some(joined) = self.pending.try_join_next() {
            self.joined(joined);
        }
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.pending.join_next().await {
            self.joined(joined);
        }
    }

    fn joined(&mut self, joined: Result<chanlogs_core::Result<RecordSummary>, JoinError>) {
        match joined {
            Ok(outcome) => self.tally(outcome),
            Err(e) => {
                warn!(error = %e, "Record task panicked");
                self.stats.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &Path) -> ChanlogsConfig {
        ChanlogsConfig { logdir: dir.to_path_buf(), by_day: false, ..Default::default() }
    }

    fn read(dir: &Path, file: &str) -> String {
        std::fs::read_to_string(dir.join(file)).unwrap_or_default()
    }

    const SESSION: &str = "\
@time=2024-05-01T21:00:00Z :ferris!crab@rust-lang.org JOIN #a
@time=2024-05-01T21:00:01Z :ferris!crab@rust-lang.org JOIN #b
@time=2024-05-01T21:00:02Z :ferris!crab@rust-lang.org PRIVMSG #a :hello

:broken.prefix.only
@time=2024-05-01T21:00:03Z :ferris!crab@rust-lang.org QUIT :Ping timeout
";

    #[tokio::test]
    async fn test_replay_fans_out_quit_to_joined_channels() {
        let dir = tempfile::tempdir().unwrap();
        let stats = replay(&config(dir.path()), SESSION.as_bytes(), false).await.unwrap();

        assert_eq!(stats.lines, 5);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.records.written, 5);
        assert_eq!(
            read(dir.path(), "#a.log"),
            "[21:00:00] *** Joins: ferris (crab@rust-lang.org)\n\
             [21:00:02] <ferris> hello\n\
             [21:00:03] *** Quits: ferris (crab@rust-lang.org) (Ping timeout)\n"
        );
        let quit = "*** Quits: ferris (crab@rust-lang.org) (Ping timeout)\n";
        assert!(read(dir.path(), "#b.log").ends_with(quit));
    }

    #[tokio::test]
    async fn test_concurrent_replay_writes_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = String::from(":ferris!crab@h JOIN #rust\n");
        for i in 0..40 {
            let time = "@time=2024-05-01T21:00:00Z";
            let line = format!("{time} :ferris!crab@h PRIVMSG #rust :line {i}\n");
            input.push_str(&line);
        }
        let stats = replay(&config(dir.path()), input.as_bytes(), true).await.unwrap();

        assert_eq!(stats.records.written, 41);
        let log = read(dir.path(), "#rust.log");
        assert_eq!(log.lines().count(), 41);
        assert!(log.lines().all(|l| l.starts_with('[')));
    }

    #[tokio::test]
    async fn test_operator_can_stop_logging() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ChanlogsConfig { allow_toggle: true, ..config(dir.path()) };
        let input = "\
@time=2024-05-01T21:00:00Z :op!o@h JOIN #rust
@time=2024-05-01T21:00:01Z :irc.server MODE #rust +o op
@time=2024-05-01T21:00:02Z :op!o@h PRIVMSG #rust :.chanlogs stop
@time=2024-05-01T21:00:03Z :op!o@h PRIVMSG #rust :off the record
";
        let stats = replay(&cfg, input.as_bytes(), false).await.unwrap();

        assert_eq!(stats.commands, 1);
        assert_eq!(stats.records.filtered, 1);
        let log = read(dir.path(), "#rust.log");
        assert!(log.contains(".chanlogs stop"));
        assert!(!log.contains("off the record"));
    }

    #[tokio::test]
    async fn test_regular_user_cannot_stop_logging() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ChanlogsConfig { allow_toggle: true, ..config(dir.path()) };
        let input = "\
:ferris!crab@h JOIN #rust
:ferris!crab@h PRIVMSG #rust :.chanlogs stop
:ferris!crab@h PRIVMSG #rust :still logged
";
        let stats = replay(&cfg, input.as_bytes(), false).await.unwrap();

        assert_eq!(stats.commands, 1);
        assert_eq!(stats.records.filtered, 0);
        assert!(read(dir.path(), "#rust.log").contains("still logged"));
    }
}
