pub mod error;
pub mod event;
pub mod format;
pub mod normalize;
pub mod target;
pub mod timezone;
pub mod toggle;

pub use error::{ChanlogError, Result};
pub use event::{CanonicalEvent, CanonicalEventBuilder, EventType, RawEvent};
pub use format::{default_template, Formatter, Template};
pub use normalize::Normalizer;
pub use target::{is_channel, sanitize, Resolution, ResolverPolicy, StorageKey, TargetResolver};
pub use timezone::parse_utc_offset;
pub use toggle::{toggle_key, MemoryToggleStore, ToggleLookup, ToggleStore};
