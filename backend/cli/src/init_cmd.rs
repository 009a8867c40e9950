//! `chanlogs init`: first-run setup.

use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use chanlogs_config::{validate, write_config, ChanlogsConfig};
use chanlogs_storage::ChanLogger;

use crate::open_toggles;
use crate::terminal_output::{note_error, note_info, note_success};

/// Write the config if missing, then bootstrap the configured backend.
pub async fn run(config_path: &Path, config: &ChanlogsConfig) -> Result<()> {
    if tokio::fs::try_exists(config_path).await.unwrap_or(false) {
        note_info(&format!("Using existing config at {}", config_path.display()));
    } else {
        write_config(config, config_path).await?;
        note_success(&format!("Wrote default config to {}", config_path.display()));
    }

    let report = validate(config);
    if !report.is_valid() {
        for err in &report.errors {
            note_error(&err.to_string());
        }
        bail!("Config has {} error(s); run `chanlogs check` for details", report.errors.len());
    }

    let toggles = open_toggles(config)?;
    let logger = ChanLogger::from_config(config, toggles.lookup)?;
    logger.init().await?;
    info!(backend = ?config.backend, "Initialised");

    match config.backend {
        chanlogs_config::Backend::File => {
            note_success(&format!("Log directory ready at {}", config.logdir.display()))
        }
        chanlogs_config::Backend::Database => note_success("Database schema ready"),
    }
    Ok(())
}
