//! Storage-key computation and persistence filtering.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::event::CanonicalEvent;
use crate::toggle::ToggleLookup;

/// Characters that never reach a file name.
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/?%*:|"<>. ]"#).unwrap());

pub const PLACEHOLDER: &str = "__";

/// Replace unsafe characters with `__` and lower-case the result.
///
/// The output contains no unsafe characters, so applying this twice is the
/// same as applying it once.
pub fn sanitize(name: &str) -> String {
    UNSAFE_CHARS.replace_all(name, PLACEHOLDER).to_lowercase()
}

/// Channel names start with one of the RFC 2811 channel prefixes;
/// anything else is a private conversation.
pub fn is_channel(name: &str) -> bool {
    name.starts_with(['#', '&', '+', '!'])
}

/// Sanitized, optionally date-partitioned name of a log destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<key>.log`
    pub fn file_name(&self) -> String {
        format!("{}.log", self.0)
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Switches that decide naming and filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// Log private conversations.
    pub privmsg: bool,
    /// Split files by local date.
    pub by_day: bool,
    /// Honour per-channel toggles.
    pub allow_toggle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: StorageKey,
    pub should_persist: bool,
}

pub struct TargetResolver {
    policy: ResolverPolicy,
    toggles: Arc<dyn ToggleLookup>,
}

impl TargetResolver {
    pub fn new(policy: ResolverPolicy, toggles: Arc<dyn ToggleLookup>) -> Self {
        Self { policy, toggles }
    }

    pub fn storage_key(&self, event: &CanonicalEvent) -> StorageKey {
        let name = sanitize(event.target());
        if self.policy.by_day {
            StorageKey(format!("{name}-{}", event.date().format("%Y-%m-%d")))
        } else {
            StorageKey(name)
        }
    }

    pub fn resolve(&self, event: &CanonicalEvent) -> Resolution {
        let target = event.target();
        let should_persist = if !is_channel(target) && !self.policy.privmsg {
            false
        } else if self.policy.allow_toggle {
            self.toggles.is_logging_enabled(target)
        } else {
            true
        };
        Resolution { key: self.storage_key(event), should_persist }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::toggle::{MemoryToggleStore, ToggleStore};
    use chrono::{FixedOffset, TimeZone};

    fn event(target: &str) -> CanonicalEvent {
        let ts = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 31, 0, 15, 0)
            .unwrap();
        CanonicalEvent::builder(target, EventType::Privmsg, ts).nick("ferris").build()
    }

    fn resolver(policy: ResolverPolicy) -> (TargetResolver, Arc<MemoryToggleStore>) {
        let toggles = Arc::new(MemoryToggleStore::new());
        (TargetResolver::new(policy, toggles.clone()), toggles)
    }

    #[test]
    fn test_sanitize_lowercases_and_is_idempotent() {
        let once = sanitize("#a/b c");
        assert_eq!(once, "#a__b__c");
        assert_eq!(sanitize(&once), once);

        let messy = sanitize("#Foo.Bar:baz|<q>?%*\"");
        assert_eq!(messy, "#foo__bar__baz____q__________");
        assert_eq!(sanitize(&messy), messy);
    }

    #[test]
    fn test_is_channel() {
        assert!(is_channel("#rust"));
        assert!(is_channel("&local"));
        assert!(is_channel("+modeless"));
        assert!(is_channel("!12345chan"));
        assert!(!is_channel("ferris"));
        assert!(!is_channel(""));
    }

    #[test]
    fn test_key_with_and_without_date() {
        let (daily, _) = resolver(ResolverPolicy { by_day: true, ..Default::default() });
        assert_eq!(daily.resolve(&event("#Rust")).key.as_str(), "#rust-2024-01-31");

        let (flat, _) = resolver(ResolverPolicy::default());
        let key = flat.resolve(&event("#Rust")).key;
        assert_eq!(key.as_str(), "#rust");
        assert_eq!(key.file_name(), "#rust.log");
    }

    #[test]
    fn test_private_messages_suppressed_unless_enabled() {
        let (r, _) = resolver(ResolverPolicy::default());
        assert!(!r.resolve(&event("ferris")).should_persist);
        assert!(r.resolve(&event("#rust")).should_persist);

        let (r, _) = resolver(ResolverPolicy { privmsg: true, ..Default::default() });
        assert!(r.resolve(&event("ferris")).should_persist);
    }

    #[test]
    fn test_toggle_only_applies_when_allowed() {
        let (r, toggles) = resolver(ResolverPolicy { allow_toggle: true, ..Default::default() });
        toggles.set_logging_enabled("#rust", false).unwrap();
        assert!(!r.resolve(&event("#rust")).should_persist);
        toggles.set_logging_enabled("#rust", true).unwrap();
        assert!(r.resolve(&event("#rust")).should_persist);

        let (r, toggles) = resolver(ResolverPolicy::default());
        toggles.set_logging_enabled("#rust", false).unwrap();
        assert!(r.resolve(&event("#rust")).should_persist);
    }
}
