//! Protocol-side plumbing for chanlogs: turning IRC wire lines into
//! [`RawEvent`](chanlogs_core::RawEvent)s and tracking who sits in which
//! channel with which privilege.

pub mod irc;
pub mod roster;

pub use irc::{parse_line, unescape_tag_value};
pub use roster::{Privilege, Roster};
