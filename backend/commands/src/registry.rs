/// Command registry: the built-in logging toggles.
use chanlogs_channels::Privilege;

use crate::types::CommandDef;

fn command(key: &str, aliases: &[&str], min_privilege: Privilege) -> CommandDef {
    CommandDef {
        key: key.to_string(),
        text_aliases: aliases.iter().map(|s| s.to_string()).collect(),
        min_privilege,
    }
}

/// Build the built-in command registry.
pub fn builtin_commands() -> Vec<CommandDef> {
    vec![
        command("start", &["chanlogs start", "chanlogs on"], Privilege::Op),
        command("stop", &["chanlogs stop", "chanlogs off"], Privilege::Op),
        command("status", &["chanlogs status", "chanlogs"], Privilege::None),
    ]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CommandRegistry {
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: builtin_commands() }
    }

    /// Find the command whose alias is the longest leading match of
    /// `words`, compared case-insensitively. Returns the definition and
    /// how many words the alias spans.
    pub fn match_words(&self, words: &[&str]) -> Option<(&CommandDef, usize)> {
        self.commands
            .iter()
            .flat_map(|c| c.text_aliases.iter().map(move |a| (c, a)))
            .filter_map(|(c, alias)| {
                let alias_words: Vec<&str> = alias.split_whitespace().collect();
                let matches = alias_words.len() <= words.len()
                    && alias_words.iter().zip(words).all(|(a, w)| a.eq_ignore_ascii_case(w));
                matches.then_some((c, alias_words.len()))
            })
            .max_by_key(|(_, len)| *len)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&CommandDef> {
        self.commands.iter().find(|c| c.key == key)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_alias_wins() {
        let registry = CommandRegistry::new();
        let (def, len) = registry.match_words(&["chanlogs", "stop"]).unwrap();
        assert_eq!((def.key.as_str(), len), ("stop", 2));

        let (def, len) = registry.match_words(&["CHANLOGS"]).unwrap();
        assert_eq!((def.key.as_str(), len), ("status", 1));

        let (def, len) = registry.match_words(&["chanlogs", "banana"]).unwrap();
        assert_eq!((def.key.as_str(), len), ("status", 1));

        assert!(registry.match_words(&["seen", "ferris"]).is_none());
        assert!(registry.match_words(&[]).is_none());
    }

    #[test]
    fn test_privileges() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.find_by_key("start").unwrap().min_privilege, Privilege::Op);
        assert_eq!(registry.find_by_key("status").unwrap().min_privilege, Privilege::None);
        assert_eq!(registry.find_by_key("stop").unwrap().primary_alias(), "chanlogs stop");
    }
}
