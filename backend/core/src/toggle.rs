//! Per-channel logging switches.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::Result;

/// Read side of the toggle store, consulted by the target resolver.
pub trait ToggleLookup: Send + Sync {
    /// Channels that were never toggled count as enabled.
    fn is_logging_enabled(&self, channel: &str) -> bool;
}

/// Read/write toggle storage used by the admin commands.
pub trait ToggleStore: ToggleLookup {
    fn set_logging_enabled(&self, channel: &str, enabled: bool) -> Result<()>;
}

/// Normalized key under which a channel's toggle is stored.
pub fn toggle_key(channel: &str) -> String {
    channel.to_lowercase()
}

/// Process-local toggle store.
#[derive(Debug, Default)]
pub struct MemoryToggleStore {
    state: RwLock<HashMap<String, bool>>,
}

impl MemoryToggleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToggleLookup for MemoryToggleStore {
    fn is_logging_enabled(&self, channel: &str) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.get(&toggle_key(channel)).copied().unwrap_or(true)
    }
}

impl ToggleStore for MemoryToggleStore {
    fn set_logging_enabled(&self, channel: &str, enabled: bool) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.insert(toggle_key(channel), enabled);
        Ok(())
    }
}
