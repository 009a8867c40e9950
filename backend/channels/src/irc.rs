/// IRC wire parser: one protocol line in, one [`RawEvent`] out.
///
/// Handles IRCv3 message tags (including the `time` tag), the
/// `:nick!ident@host` prefix and middle/trailing parameters, then applies
/// the routing rules the logger relies on: private messages route to the
/// peer nick, NICK routes to the new nick, QUIT to the quitting nick.
use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chanlogs_core::{is_channel, RawEvent};
use chrono::{DateTime, Utc};
use tracing::debug;

const TIME_TAG: &str = "time";

/// Parse one line as received from the server. Trailing CR/LF is ignored.
pub fn parse_line(line: &str) -> Result<RawEvent> {
    let mut rest = line.trim_end_matches(['\r', '\n']);
    if rest.trim().is_empty() {
        bail!("empty IRC line");
    }

    let mut tags = BTreeMap::new();
    if let Some(tagged) = rest.strip_prefix('@') {
        let (raw_tags, after) = tagged.split_once(' ').unwrap_or((tagged, ""));
        tags = parse_tags(raw_tags);
        rest = after.trim_start_matches(' ');
    }

    let (mut nick, mut ident, mut host) = (String::new(), None, None);
    if let Some(prefixed) = rest.strip_prefix(':') {
        let (prefix, after) = prefixed.split_once(' ').unwrap_or((prefixed, ""));
        (nick, ident, host) = parse_prefix(prefix);
        rest = after.trim_start_matches(' ');
    }

    let (command, params) = rest.split_once(' ').unwrap_or((rest, ""));
    if command.is_empty() {
        bail!("IRC line has no command: {line:?}");
    }
    let command = command.to_ascii_uppercase();
    let args = parse_params(params);

    let time = tags.get(TIME_TAG).and_then(|t| match DateTime::parse_from_rfc3339(t) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            debug!(tag = %t, error = %e, "Ignoring unparsable server time");
            None
        }
    });

    let sender = route(&command, &nick, &args);
    let message = text_param(&command, &args);

    Ok(RawEvent { command, nick, ident, host, sender, message, args, tags, time })
}

/// `key[=value];key2` → map. Tags without a value map to `""`.
fn parse_tags(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((key, value)) => (key.to_string(), unescape_tag_value(value)),
            None => (t.to_string(), String::new()),
        })
        .collect()
}

/// Undo IRCv3 tag-value escaping.
pub fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            // A lone trailing backslash is dropped.
            None => {}
        }
    }
    out
}

fn parse_prefix(prefix: &str) -> (String, Option<String>, Option<String>) {
    let (before_host, host) = match prefix.split_once('@') {
        Some((b, h)) => (b, Some(h.to_string())),
        None => (prefix, None),
    };
    match before_host.split_once('!') {
        Some((nick, ident)) => (nick.to_string(), Some(ident.to_string()), host),
        None => (before_host.to_string(), None, host),
    }
}

fn parse_params(mut params: &str) -> Vec<String> {
    let mut args = Vec::new();
    loop {
        params = params.trim_start_matches(' ');
        if params.is_empty() {
            break;
        }
        if let Some(trailing) = params.strip_prefix(':') {
            args.push(trailing.to_string());
            break;
        }
        let (arg, after) = params.split_once(' ').unwrap_or((params, ""));
        args.push(arg.to_string());
        params = after;
    }
    args
}

/// Where the event is logged: a channel, or the peer of a private chat.
fn route(command: &str, nick: &str, args: &[String]) -> String {
    let first = args.first().map(String::as_str).unwrap_or_default();
    match command {
        "PRIVMSG" | "NOTICE" if is_channel(first) => first.to_string(),
        "PRIVMSG" | "NOTICE" => nick.to_string(),
        "NICK" if !first.is_empty() => first.to_string(),
        "QUIT" => nick.to_string(),
        _ if first.is_empty() => nick.to_string(),
        _ => first.to_string(),
    }
}

/// The human-readable payload of the event, empty when it has none.
fn text_param(command: &str, args: &[String]) -> String {
    let index = match command {
        "JOIN" => return String::new(),
        "PRIVMSG" | "NOTICE" | "PART" | "TOPIC" => 1,
        "KICK" => 2,
        "QUIT" | "NICK" => 0,
        _ => return args.last().cloned().unwrap_or_default(),
    };
    args.get(index).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_channel_privmsg() {
        let raw = parse_line(":ferris!crab@rust-lang.org PRIVMSG #rust :hello, world\r\n").unwrap();
        assert_eq!(raw.command, "PRIVMSG");
        assert_eq!(raw.nick, "ferris");
        assert_eq!(raw.ident.as_deref(), Some("crab"));
        assert_eq!(raw.host.as_deref(), Some("rust-lang.org"));
        assert_eq!(raw.sender, "#rust");
        assert_eq!(raw.message, "hello, world");
        assert_eq!(raw.args, ["#rust", "hello, world"]);
        assert!(raw.time.is_none());
    }

    #[test]
    fn test_private_message_routes_to_peer() {
        let raw = parse_line(":ferris!crab@rust-lang.org PRIVMSG chanlogs :psst").unwrap();
        assert_eq!(raw.sender, "ferris");
        let raw = parse_line(":ferris!crab@rust-lang.org notice chanlogs :hi").unwrap();
        assert_eq!(raw.command, "NOTICE");
        assert_eq!(raw.sender, "ferris");
    }

    #[test]
    fn test_ctcp_action_is_left_for_the_normalizer() {
        let raw = parse_line(":ferris!crab@h PRIVMSG #rust :\x01ACTION waves\x01").unwrap();
        assert_eq!(raw.command, "PRIVMSG");
        assert_eq!(raw.message, "\x01ACTION waves\x01");
    }

    #[test]
    fn test_tags_and_server_time() {
        let line = concat!(
            r"@time=2024-05-01T21:04:33.250Z;account=ferris;msgid=a\sb\:c\\d;+draft/reply",
            " :ferris!crab@h PRIVMSG #rust :hi",
        );
        let raw = parse_line(line).unwrap();
        assert_eq!(raw.tags["account"], "ferris");
        assert_eq!(raw.tags["msgid"], r"a b;c\d");
        assert_eq!(raw.tags["+draft/reply"], "");
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 21, 4, 33).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(raw.time, Some(expected));
    }

    #[test]
    fn test_bad_time_tag_is_ignored() {
        let raw = parse_line("@time=yesterday :ferris!crab@h PRIVMSG #rust :hi").unwrap();
        assert!(raw.time.is_none());
        assert_eq!(raw.tags["time"], "yesterday");
    }

    #[test]
    fn test_unescape_edge_cases() {
        assert_eq!(unescape_tag_value(r"trailing\"), "trailing");
        assert_eq!(unescape_tag_value(r"\x\r\n"), "x\r\n");
    }

    #[test]
    fn test_join_part_kick_routing() {
        let join = parse_line(":ferris!crab@h JOIN #rust").unwrap();
        assert_eq!(join.sender, "#rust");
        assert_eq!(join.message, "");

        let part = parse_line(":ferris!crab@h PART #rust :see you").unwrap();
        assert_eq!(part.sender, "#rust");
        assert_eq!(part.message, "see you");

        let kick = parse_line(":op!o@h KICK #rust troll :spamming").unwrap();
        assert_eq!(kick.sender, "#rust");
        assert_eq!(kick.args, ["#rust", "troll", "spamming"]);
        assert_eq!(kick.message, "spamming");
    }

    #[test]
    fn test_nick_and_quit_routing() {
        let nick = parse_line(":ferris!crab@h NICK :crabby").unwrap();
        assert_eq!(nick.nick, "ferris");
        assert_eq!(nick.sender, "crabby");

        let quit = parse_line(":ferris!crab@h QUIT :Ping timeout").unwrap();
        assert_eq!(quit.sender, "ferris");
        assert_eq!(quit.message, "Ping timeout");
    }

    #[test]
    fn test_mode_and_topic() {
        let mode = parse_line(":op!o@h MODE #rust +ov ferris ferris").unwrap();
        assert_eq!(mode.sender, "#rust");
        assert_eq!(mode.args, ["#rust", "+ov", "ferris", "ferris"]);

        let topic = parse_line(":op!o@h TOPIC #rust :Rust 2024 is out").unwrap();
        assert_eq!(topic.message, "Rust 2024 is out");
    }

    #[test]
    fn test_server_prefix_and_numeric() {
        let names =
            parse_line(":irc.libera.chat 353 chanlogs = #rust :@op +voiced ferris").unwrap();
        assert_eq!(names.command, "353");
        assert_eq!(names.nick, "irc.libera.chat");
        assert!(names.ident.is_none());
        assert_eq!(names.args, ["chanlogs", "=", "#rust", "@op +voiced ferris"]);
    }

    #[test]
    fn test_malformed_lines() {
        assert!(parse_line("").is_err());
        assert!(parse_line("\r\n").is_err());
        assert!(parse_line(":ferris!crab@h").is_err());
        assert!(parse_line("@a=b").is_err());
    }

    #[test]
    fn test_line_without_prefix() {
        let ping = parse_line("PING :irc.libera.chat").unwrap();
        assert_eq!(ping.command, "PING");
        assert_eq!(ping.nick, "");
        assert_eq!(ping.message, "irc.libera.chat");
    }
}
