//! `chanlogs toggle`: flip a channel's logging switch offline.

use anyhow::Result;

use chanlogs_config::ChanlogsConfig;
use chanlogs_core::{is_channel, ToggleStore};

use crate::open_toggle_db;
use crate::terminal_output::{note_success, note_warn};

pub fn run(config: &ChanlogsConfig, channel: &str, enabled: bool) -> Result<()> {
    if !is_channel(channel) {
        note_warn(&format!("{channel} does not look like a channel name"));
    }
    if !config.allow_toggle {
        note_warn("allow_toggle is off; the switch is stored but ignored until it is enabled");
    }

    let store = open_toggle_db(&config.toggle_db_path())?;
    store.set_logging_enabled(channel, enabled)?;

    let state = if enabled { "on" } else { "off" };
    note_success(&format!("Logging for {channel} switched {state}"));
    Ok(())
}
