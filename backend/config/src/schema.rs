//! chanlogs configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every field has a default, so
//! an empty document is a valid (file-backend) configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use chanlogs_core::{parse_utc_offset, EventType, Formatter, Normalizer, ResolverPolicy};
use tracing::warn;

use crate::defaults;

/// Where canonical events are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Database,
}

/// Root configuration for chanlogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChanlogsConfig {
    /// Storage backend switch.
    #[serde(default)]
    pub backend: Backend,

    /// Log directory for the file backend.
    #[serde(default = "defaults::logdir")]
    pub logdir: PathBuf,

    /// Split file logs per local day.
    #[serde(default = "defaults::by_day")]
    pub by_day: bool,

    /// Log private conversations.
    #[serde(default)]
    pub privmsg: bool,

    /// Enable the admin start/stop commands and honour their toggles.
    #[serde(default)]
    pub allow_toggle: bool,

    /// Database location for the database backend.
    #[serde(default, alias = "connectionString", skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    /// Value written to the `network` column.
    #[serde(default = "defaults::network")]
    pub network: String,

    /// Display zone for timestamps.
    #[serde(default = "defaults::timezone")]
    pub timezone: String,

    /// Per-channel display zone overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub channel_timezones: BTreeMap<String, String>,

    /// Toggle persistence; `<logdir>/toggles.db` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle_db: Option<PathBuf>,

    /// Prefix the admin commands are invoked with.
    #[serde(default = "defaults::command_prefix")]
    pub command_prefix: String,

    /// Per-type template overrides keyed by lowercase event type.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: BTreeMap<String, String>,

    /// Diagnostics logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ChanlogsConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            logdir: defaults::logdir(),
            by_day: defaults::by_day(),
            privmsg: false,
            allow_toggle: false,
            connection_string: None,
            network: defaults::network(),
            timezone: defaults::timezone(),
            channel_timezones: BTreeMap::new(),
            toggle_db: None,
            command_prefix: defaults::command_prefix(),
            templates: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
    /// Directory for the rolling diagnostics file; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: defaults::log_level(), dir: None, json: false }
    }
}

impl ChanlogsConfig {
    pub fn resolver_policy(&self) -> ResolverPolicy {
        ResolverPolicy {
            privmsg: self.privmsg,
            by_day: self.by_day,
            allow_toggle: self.allow_toggle,
        }
    }

    /// Overrides keyed by event type. Keys naming no event type are skipped
    /// with a warning.
    pub fn template_overrides(&self) -> BTreeMap<EventType, String> {
        let mut overrides = BTreeMap::new();
        for (key, template) in &self.templates {
            match EventType::from_template_key(key) {
                Some(t) => {
                    overrides.insert(t, template.clone());
                }
                None => warn!("No template defined for '{}'", key),
            }
        }
        overrides
    }

    pub fn formatter(&self) -> chanlogs_core::Result<Formatter> {
        Formatter::with_overrides(&self.template_overrides())
    }

    pub fn normalizer(&self) -> chanlogs_core::Result<Normalizer> {
        let mut normalizer = Normalizer::new(parse_utc_offset(&self.timezone)?);
        for (channel, zone) in &self.channel_timezones {
            normalizer = normalizer.with_target_offset(channel, parse_utc_offset(zone)?);
        }
        Ok(normalizer)
    }

    pub fn toggle_db_path(&self) -> PathBuf {
        self.toggle_db
            .clone()
            .unwrap_or_else(|| self.logdir.join(defaults::TOGGLE_DB_FILE))
    }
}
