use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChanlogError;

/// The closed set of event kinds that end up in a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Privmsg,
    /// Derived from a CTCP-wrapped PRIVMSG/NOTICE; never seen on the wire.
    Action,
    Notice,
    Join,
    Part,
    Kick,
    Nick,
    Quit,
    Mode,
    Topic,
}

impl EventType {
    pub const COUNT: usize = 10;

    pub const ALL: [EventType; Self::COUNT] = [
        EventType::Privmsg,
        EventType::Action,
        EventType::Notice,
        EventType::Join,
        EventType::Part,
        EventType::Kick,
        EventType::Nick,
        EventType::Quit,
        EventType::Mode,
        EventType::Topic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Privmsg => "PRIVMSG",
            EventType::Action => "ACTION",
            EventType::Notice => "NOTICE",
            EventType::Join => "JOIN",
            EventType::Part => "PART",
            EventType::Kick => "KICK",
            EventType::Nick => "NICK",
            EventType::Quit => "QUIT",
            EventType::Mode => "MODE",
            EventType::Topic => "TOPIC",
        }
    }

    /// Position in [`EventType::ALL`]; used to index per-type tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// QUIT and NICK touch every channel the user is in.
    pub fn fans_out(self) -> bool {
        matches!(self, EventType::Nick | EventType::Quit)
    }

    /// Resolve a template-override key such as `kick`, `KICK` or `kick_template`.
    pub fn from_template_key(key: &str) -> Option<Self> {
        let trimmed = key.trim();
        let name = trimmed
            .strip_suffix("_template")
            .or_else(|| trimmed.strip_suffix("_TEMPLATE"))
            .unwrap_or(trimmed);
        name.parse().ok()
    }
}

impl FromStr for EventType {
    type Err = ChanlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ChanlogError::UnsupportedEvent(s.to_string()))
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound protocol event as handed over by the connection layer.
///
/// Field values are taken as-is from the wire; nothing here is validated
/// until the normalizer sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Protocol command, e.g. `PRIVMSG` or `kick`.
    pub command: String,
    pub nick: String,
    pub ident: Option<String>,
    pub host: Option<String>,
    /// Routing target: the channel, or the peer nick for private traffic.
    pub sender: String,
    /// Trailing text payload.
    pub message: String,
    pub args: Vec<String>,
    pub tags: BTreeMap<String, String>,
    /// Server-supplied time, when the connection provides one.
    pub time: Option<DateTime<Utc>>,
}

/// A normalized event addressed to exactly one log target.
///
/// Built once through [`CanonicalEvent::builder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEvent {
    target: String,
    #[serde(rename = "type")]
    event_type: EventType,
    message: String,
    nick: String,
    ident: Option<String>,
    host: Option<String>,
    sender: String,
    timestamp: DateTime<FixedOffset>,
    args: Vec<String>,
    tags: BTreeMap<String, String>,
    intent: Option<String>,
}

impl CanonicalEvent {
    pub fn builder(
        target: impl Into<String>,
        event_type: EventType,
        timestamp: DateTime<FixedOffset>,
    ) -> CanonicalEventBuilder {
        CanonicalEventBuilder {
            event: CanonicalEvent {
                target: target.into(),
                event_type,
                message: String::new(),
                nick: String::new(),
                ident: None,
                host: None,
                sender: String::new(),
                timestamp,
                args: Vec::new(),
                tags: BTreeMap::new(),
                intent: None,
            },
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Local calendar date of the event.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Local wall-clock time as `HH:MM:SS`.
    pub fn time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// `args[1..]` joined by single spaces (the mode string for MODE).
    pub fn args_joined(&self) -> String {
        self.args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn intent(&self) -> Option<&str> {
        self.intent.as_deref()
    }
}

pub struct CanonicalEventBuilder {
    event: CanonicalEvent,
}

impl CanonicalEventBuilder {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.event.message = message.into();
        self
    }

    pub fn nick(mut self, nick: impl Into<String>) -> Self {
        self.event.nick = nick.into();
        self
    }

    pub fn ident(mut self, ident: Option<String>) -> Self {
        self.event.ident = ident;
        self
    }

    pub fn host(mut self, host: Option<String>) -> Self {
        self.event.host = host;
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.event.sender = sender.into();
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.event.args = args;
        self
    }

    pub fn tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.event.tags = tags;
        self
    }

    /// Finish the event: drops sub-second precision and promotes `intent`.
    pub fn build(mut self) -> CanonicalEvent {
        self.event.timestamp = self.event.timestamp.trunc_subsecs(0);
        self.event.intent = self.event.tags.get("intent").cloned();
        self.event
    }
}
