//! Config defaults: default values and post-load path expansion.

use std::path::{Path, PathBuf};

use crate::schema::ChanlogsConfig;

/// Default log directory (expanded against `$HOME` after load).
pub const DEFAULT_LOGDIR: &str = "~/chanlogs";

/// Default network name for database rows.
pub const DEFAULT_NETWORK: &str = "irc";

pub const DEFAULT_TIMEZONE: &str = "UTC";

pub const DEFAULT_COMMAND_PREFIX: &str = ".";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// File name of the toggle database inside the log directory.
pub const TOGGLE_DB_FILE: &str = "toggles.db";

pub(crate) fn logdir() -> PathBuf {
    PathBuf::from(DEFAULT_LOGDIR)
}

pub(crate) fn by_day() -> bool {
    true
}

pub(crate) fn network() -> String {
    DEFAULT_NETWORK.to_string()
}

pub(crate) fn timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

pub(crate) fn command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}

pub(crate) fn log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Apply all post-load defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ChanlogsConfig) -> ChanlogsConfig {
    let config = apply_path_defaults(config);
    apply_prefix_defaults(config)
}

/// Expand `~` in every configured path.
fn apply_path_defaults(mut config: ChanlogsConfig) -> ChanlogsConfig {
    config.logdir = expand_home(&config.logdir);
    config.toggle_db = config.toggle_db.as_deref().map(expand_home);
    config.logging.dir = config.logging.dir.as_deref().map(expand_home);
    config
}

/// Strip stray whitespace from the command prefix.
fn apply_prefix_defaults(mut config: ChanlogsConfig) -> ChanlogsConfig {
    config.command_prefix = config.command_prefix.trim().to_string();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_home_prefix() {
        let Some(home) = dirs::home_dir() else { return };
        assert_eq!(expand_home(Path::new("~/chanlogs")), home.join("chanlogs"));
        assert_eq!(expand_home(Path::new("/var/log")), PathBuf::from("/var/log"));
        assert_eq!(expand_home(Path::new("~other/x")), PathBuf::from("~other/x"));
    }

    #[test]
    fn applies_path_expansion() {
        let Some(home) = dirs::home_dir() else { return };
        let cfg = ChanlogsConfig {
            toggle_db: Some(PathBuf::from("~/t.db")),
            command_prefix: " ! ".into(),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.logdir, home.join("chanlogs"));
        assert_eq!(cfg.toggle_db, Some(home.join("t.db")));
        assert_eq!(cfg.command_prefix, "!");
    }
}
