/// Admin command types.
use chanlogs_channels::Privilege;

// ---------------------------------------------------------------------------
// Command definition
// ---------------------------------------------------------------------------

/// A command entry in the registry. Every command is said inside a channel
/// and acts on that channel.
#[derive(Debug, Clone)]
pub struct CommandDef {
    /// Unique key, also the handler key (e.g. "start").
    pub key: String,
    /// Invocation words without the prefix (e.g. "chanlogs start").
    pub text_aliases: Vec<String>,
    /// Lowest channel privilege allowed to run the command.
    pub min_privilege: Privilege,
}

impl CommandDef {
    /// Primary alias (first in list), or key if none.
    pub fn primary_alias(&self) -> &str {
        self.text_aliases.first().map(|s| s.as_str()).unwrap_or(&self.key)
    }
}

// ---------------------------------------------------------------------------
// Parsed invocation
// ---------------------------------------------------------------------------

/// A detected command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub key: String,
    pub raw_alias: String,
    /// Whitespace-separated words after the alias.
    pub args: Vec<String>,
    /// Full remaining text after the alias.
    pub raw_args: String,
}
