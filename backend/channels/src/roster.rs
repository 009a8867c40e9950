/// Channel roster: who is in which channel, and with what privilege.
///
/// Fed every parsed event after it has been recorded. The logger asks it
/// which channels a QUIT or NICK touches, and the admin commands ask it
/// whether the invoker may toggle logging.
use std::collections::{BTreeSet, HashMap};

use chanlogs_core::{is_channel, RawEvent};
use tracing::{debug, trace};

const RPL_NAMREPLY: &str = "353";

/// Channel privilege, lowest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    #[default]
    None,
    Voice,
    HalfOp,
    Op,
    Admin,
    Owner,
}

impl Privilege {
    /// Channel mode letter → privilege (`+v`, `+h`, `+o`, `+a`, `+q`).
    pub fn from_mode(mode: char) -> Option<Self> {
        match mode {
            'v' => Some(Self::Voice),
            'h' => Some(Self::HalfOp),
            'o' => Some(Self::Op),
            'a' => Some(Self::Admin),
            'q' => Some(Self::Owner),
            _ => None,
        }
    }

    /// NAMES prefix symbol → privilege (`+`, `%`, `@`, `&`, `~`).
    pub fn from_prefix(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Voice),
            '%' => Some(Self::HalfOp),
            '@' => Some(Self::Op),
            '&' => Some(Self::Admin),
            '~' => Some(Self::Owner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Member {
    nick: String,
    modes: BTreeSet<Privilege>,
}

impl Member {
    fn new(nick: &str) -> Self {
        Self { nick: nick.to_string(), modes: BTreeSet::new() }
    }

    fn privilege(&self) -> Privilege {
        self.modes.last().copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct ChannelState {
    name: String,
    members: HashMap<String, Member>,
}

#[derive(Debug, Default)]
pub struct Roster {
    channels: HashMap<String, ChannelState>,
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update membership from one event.
    pub fn apply(&mut self, raw: &RawEvent) {
        let first = raw.args.first().map(String::as_str).unwrap_or_default();
        match raw.command.as_str() {
            "JOIN" => self.join(first, &raw.nick),
            "PART" => self.leave(first, &raw.nick),
            "KICK" => {
                if let Some(victim) = raw.args.get(1) {
                    self.leave(first, victim);
                }
            }
            "QUIT" => self.quit(&raw.nick),
            "NICK" if !first.is_empty() => self.rename(&raw.nick, first),
            "MODE" if is_channel(first) => self.apply_modes(first, &raw.args[1..]),
            RPL_NAMREPLY => {
                if let (Some(channel), Some(names)) = (raw.args.get(2), raw.args.get(3)) {
                    self.names(channel, names);
                }
            }
            _ => {}
        }
    }

    /// Channels in which `nick` (or, for a rename already applied, `new_nick`)
    /// is present. Sorted for stable fan-out order.
    pub fn affected_channels(&self, nick: &str, new_nick: Option<&str>) -> Vec<String> {
        let nick = fold(nick);
        let new_nick = new_nick.map(fold);
        let mut channels: Vec<String> = self
            .channels
            .values()
            .filter(|c| {
                c.members.contains_key(&nick)
                    || new_nick.as_ref().is_some_and(|n| c.members.contains_key(n))
            })
            .map(|c| c.name.clone())
            .collect();
        channels.sort();
        channels
    }

    pub fn privilege(&self, channel: &str, nick: &str) -> Privilege {
        self.channels
            .get(&fold(channel))
            .and_then(|c| c.members.get(&fold(nick)))
            .map(Member::privilege)
            .unwrap_or_default()
    }

    pub fn is_member(&self, channel: &str, nick: &str) -> bool {
        self.channels
            .get(&fold(channel))
            .is_some_and(|c| c.members.contains_key(&fold(nick)))
    }

    fn channel_mut(&mut self, channel: &str) -> &mut ChannelState {
        self.channels.entry(fold(channel)).or_insert_with(|| ChannelState {
            name: channel.to_string(),
            members: HashMap::new(),
        })
    }

    fn join(&mut self, channel: &str, nick: &str) {
        if channel.is_empty() || nick.is_empty() {
            return;
        }
        self.channel_mut(channel).members.entry(fold(nick)).or_insert_with(|| Member::new(nick));
        trace!(channel, nick, "Member joined");
    }

    fn leave(&mut self, channel: &str, nick: &str) {
        let key = fold(channel);
        if let Some(state) = self.channels.get_mut(&key) {
            state.members.remove(&fold(nick));
            if state.members.is_empty() {
                self.channels.remove(&key);
                debug!(channel, "Channel roster emptied");
            }
        }
    }

    fn quit(&mut self, nick: &str) {
        let nick = fold(nick);
        for state in self.channels.values_mut() {
            state.members.remove(&nick);
        }
        self.channels.retain(|_, c| !c.members.is_empty());
    }

    fn rename(&mut self, old: &str, new: &str) {
        let (old_key, new_key) = (fold(old), fold(new));
        for state in self.channels.values_mut() {
            if let Some(mut member) = state.members.remove(&old_key) {
                member.nick = new.to_string();
                state.members.insert(new_key.clone(), member);
            }
        }
    }

    /// `+ov-v alice bob carol`: walk the mode string, consuming one
    /// parameter per mode that takes one.
    fn apply_modes(&mut self, channel: &str, args: &[String]) {
        let Some((modes, params)) = args.split_first() else { return };
        let mut params = params.iter();
        let mut adding = true;
        for mode in modes.chars() {
            match mode {
                '+' => adding = true,
                '-' => adding = false,
                _ => {
                    if let Some(privilege) = Privilege::from_mode(mode) {
                        let Some(nick) = params.next() else { break };
                        self.set_mode(channel, nick, privilege, adding);
                    } else if takes_param(mode, adding) {
                        params.next();
                    }
                }
            }
        }
    }

    fn set_mode(&mut self, channel: &str, nick: &str, privilege: Privilege, adding: bool) {
        let Some(member) = self
            .channels
            .get_mut(&fold(channel))
            .and_then(|c| c.members.get_mut(&fold(nick)))
        else {
            return;
        };
        if adding {
            member.modes.insert(privilege);
        } else {
            member.modes.remove(&privilege);
        }
    }

    /// RPL_NAMREPLY: `@op +voiced ~owner plain`, with multi-prefix and
    /// userhost-in-names forms accepted.
    fn names(&mut self, channel: &str, names: &str) {
        for entry in names.split_whitespace() {
            let nick_start = entry
                .find(|c| Privilege::from_prefix(c).is_none())
                .unwrap_or(entry.len());
            let (prefixes, rest) = entry.split_at(nick_start);
            let nick = rest.split('!').next().unwrap_or(rest);
            if nick.is_empty() {
                continue;
            }
            let member = self
                .channel_mut(channel)
                .members
                .entry(fold(nick))
                .or_insert_with(|| Member::new(nick));
            member.modes.extend(prefixes.chars().filter_map(Privilege::from_prefix));
        }
    }
}

/// List and key modes always carry a parameter; the limit only when set.
fn takes_param(mode: char, adding: bool) -> bool {
    matches!(mode, 'b' | 'e' | 'I' | 'k') || (mode == 'l' && adding)
}
