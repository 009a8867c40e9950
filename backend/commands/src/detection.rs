/// Command detection: identify `<prefix>chanlogs ...` in channel text.
use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

/// Detect a command at the start of a message.
/// Returns `None` for ordinary messages and unknown commands.
pub fn detect_command(
    text: &str,
    prefix: &str,
    registry: &CommandRegistry,
) -> Option<CommandInvocation> {
    if prefix.is_empty() {
        return None;
    }
    let body = text.trim().strip_prefix(prefix)?;
    if body.starts_with(char::is_whitespace) {
        return None;
    }

    let words: Vec<&str> = body.split_whitespace().collect();
    let (def, consumed) = registry.match_words(&words)?;
    let raw_alias = words[..consumed].join(" ");
    let args: Vec<String> = words[consumed..].iter().map(|w| w.to_string()).collect();

    Some(CommandInvocation {
        key: def.key.clone(),
        raw_alias,
        raw_args: args.join(" "),
        args,
    })
}
