//! Raw protocol events → canonical, per-target records.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::{ChanlogError, Result};
use crate::event::{CanonicalEvent, EventType, RawEvent};
use crate::timezone::utc;

const CTCP_ACTION_PREFIX: &str = "\x01ACTION ";
const CTCP_MARKER: char = '\x01';

/// Turns a [`RawEvent`] into one [`CanonicalEvent`] per affected target.
#[derive(Debug, Clone)]
pub struct Normalizer {
    default_offset: FixedOffset,
    target_offsets: HashMap<String, FixedOffset>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(utc())
    }
}

impl Normalizer {
    pub fn new(default_offset: FixedOffset) -> Self {
        Self { default_offset, target_offsets: HashMap::new() }
    }

    /// Override the display zone for a single target.
    pub fn with_target_offset(mut self, target: &str, offset: FixedOffset) -> Self {
        self.target_offsets.insert(target.to_lowercase(), offset);
        self
    }

    pub fn offset_for(&self, target: &str) -> FixedOffset {
        self.target_offsets
            .get(&target.to_lowercase())
            .copied()
            .unwrap_or(self.default_offset)
    }

    /// Normalize using the event's server time, or now if it has none.
    pub fn normalize(
        &self,
        raw: &RawEvent,
        affected_targets: &[String],
    ) -> Result<Vec<CanonicalEvent>> {
        self.normalize_at(raw, affected_targets, raw.time.unwrap_or_else(Utc::now))
    }

    /// Normalize with an explicit capture time.
    ///
    /// `affected_targets` is only consulted for QUIT and NICK; every other
    /// type is logged against its own routing target.
    pub fn normalize_at(
        &self,
        raw: &RawEvent,
        affected_targets: &[String],
        captured: DateTime<Utc>,
    ) -> Result<Vec<CanonicalEvent>> {
        let wire_type: EventType = raw.command.parse()?;
        if wire_type == EventType::Action {
            return Err(ChanlogError::UnsupportedEvent(raw.command.clone()));
        }

        // Reclassify once, ahead of fan-out, so every copy agrees.
        let (event_type, message) = match strip_ctcp_action(&raw.message) {
            Some(body) => (EventType::Action, body.to_string()),
            None => (wire_type, raw.message.clone()),
        };

        let targets: Vec<&str> = if event_type.fans_out() {
            let mut seen = HashSet::new();
            affected_targets
                .iter()
                .filter(|t| seen.insert(t.to_lowercase()))
                .map(String::as_str)
                .collect()
        } else {
            vec![raw.sender.as_str()]
        };

        let events = targets
            .into_iter()
            .map(|target| {
                let local = captured.with_timezone(&self.offset_for(target));
                CanonicalEvent::builder(target, event_type, local)
                    .message(message.clone())
                    .nick(raw.nick.clone())
                    .ident(raw.ident.clone())
                    .host(raw.host.clone())
                    .sender(raw.sender.clone())
                    .args(raw.args.clone())
                    .tags(raw.tags.clone())
                    .build()
            })
            .collect();

        Ok(events)
    }
}

/// Body of a `\x01ACTION ...\x01` message, if that is what this is.
fn strip_ctcp_action(message: &str) -> Option<&str> {
    message
        .strip_prefix(CTCP_ACTION_PREFIX)
        .and_then(|rest| rest.strip_suffix(CTCP_MARKER))
}
