//! Template rendering of canonical events into log lines.
//!
//! Templates use `{field}` placeholders: `time`, `date`, `datetime`, `nick`,
//! `ident`, `host`, `sender`, `message`, `target` (alias `channel`), `type`,
//! `argsJoined` (alias `args_str`), `intent`, `args[N]` and `tags[key]`.
//! `{{` and `}}` produce literal braces.

use std::borrow::Cow;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::error::{ChanlogError, Result};
use crate::event::{CanonicalEvent, EventType};

/// Built-in template for every event type.
pub fn default_template(event_type: EventType) -> &'static str {
    match event_type {
        EventType::Privmsg => "[{time}] <{nick}> {message}",
        EventType::Action => "[{time}] * {nick} {message}",
        EventType::Notice => "[{time}] -{nick}- {message}",
        EventType::Nick => "[{time}] *** {nick} is now known as {sender}",
        EventType::Join => "[{time}] *** Joins: {nick} ({ident}@{host})",
        EventType::Part => "[{time}] *** Parts: {nick} ({ident}@{host}) ({message})",
        EventType::Quit => "[{time}] *** Quits: {nick} ({ident}@{host}) ({message})",
        EventType::Kick => "[{time}] *** {args[1]} was kicked by {nick} ({message})",
        EventType::Mode => "[{time}] *** {nick} sets mode: {argsJoined}",
        EventType::Topic => "[{time}] *** {nick} changes topic to '{message}'",
    }
}

static BUILTIN: Lazy<Vec<Template>> = Lazy::new(|| {
    EventType::ALL
        .into_iter()
        .map(|t| Template::parse(default_template(t)).expect("built-in templates are well formed"))
        .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Time,
    Date,
    Datetime,
    Nick,
    Ident,
    Host,
    Sender,
    Message,
    Target,
    Type,
    ArgsJoined,
    Intent,
    Arg(usize),
    Tag(String),
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        let field = match name {
            "time" => Field::Time,
            "date" => Field::Date,
            "datetime" => Field::Datetime,
            "nick" => Field::Nick,
            "ident" => Field::Ident,
            "host" => Field::Host,
            "sender" => Field::Sender,
            "message" => Field::Message,
            "target" | "channel" => Field::Target,
            "type" => Field::Type,
            "argsJoined" | "args_str" => Field::ArgsJoined,
            "intent" => Field::Intent,
            _ => {
                let (base, index) = name.strip_suffix(']')?.split_once('[')?;
                match base {
                    "args" => Field::Arg(index.parse().ok()?),
                    "tags" if !index.is_empty() => Field::Tag(index.to_string()),
                    _ => return None,
                }
            }
        };
        Some(field)
    }

    fn value<'e>(&self, event: &'e CanonicalEvent) -> Option<Cow<'e, str>> {
        match self {
            Field::Time => Some(Cow::Owned(event.time())),
            Field::Date => Some(Cow::Owned(event.date().to_string())),
            Field::Datetime => {
                Some(Cow::Owned(event.timestamp().format("%Y-%m-%dT%H:%M:%S").to_string()))
            }
            Field::Nick => Some(Cow::Borrowed(event.nick())),
            Field::Ident => event.ident().map(Cow::Borrowed),
            Field::Host => event.host().map(Cow::Borrowed),
            Field::Sender => Some(Cow::Borrowed(event.sender())),
            Field::Message => Some(Cow::Borrowed(event.message())),
            Field::Target => Some(Cow::Borrowed(event.target())),
            Field::Type => Some(Cow::Borrowed(event.event_type().as_str())),
            Field::ArgsJoined => Some(Cow::Owned(event.args_joined())),
            Field::Intent => event.intent().map(Cow::Borrowed),
            Field::Arg(i) => event.args().get(*i).map(|a| Cow::Borrowed(a.as_str())),
            Field::Tag(key) => event.tags().get(key).map(|v| Cow::Borrowed(v.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { name: String, field: Field },
}

/// A parsed log-line template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let err = |reason: String| ChanlogError::Template { template: source.to_string(), reason };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(err("nested '{'".into())),
                            Some(ch) => name.push(ch),
                            None => return Err(err("unclosed '{'".into())),
                        }
                    }
                    let field = Field::parse(&name)
                        .ok_or_else(|| err(format!("unknown field '{name}'")))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field { name, field });
                }
                '}' => return Err(err("single '}' encountered".into())),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { source: source.to_string(), segments })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute every placeholder; any field the event lacks is an error.
    pub fn render(&self, event: &CanonicalEvent) -> Result<String> {
        let mut line = String::with_capacity(self.source.len() + event.message().len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Field { name, field } => {
                    let value = field.value(event).ok_or_else(|| ChanlogError::MissingField {
                        field: name.clone(),
                        event_type: event.event_type().to_string(),
                    })?;
                    line.push_str(&value);
                }
            }
        }
        Ok(line)
    }
}

/// Enum-indexed template table: configured overrides first, built-ins second.
#[derive(Debug, Clone)]
pub struct Formatter {
    table: Vec<Template>,
}

impl Default for Formatter {
    fn default() -> Self {
        Self { table: BUILTIN.clone() }
    }
}

impl Formatter {
    /// Build a formatter from per-type override strings. Empty overrides
    /// count as unset.
    pub fn with_overrides(overrides: &BTreeMap<EventType, String>) -> Result<Self> {
        let table = EventType::ALL
            .into_iter()
            .map(|t| match overrides.get(&t).filter(|s| !s.is_empty()) {
                Some(source) => Template::parse(source),
                None => Ok(BUILTIN[t.index()].clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { table })
    }

    pub fn template_for(&self, event_type: EventType) -> &Template {
        &self.table[event_type.index()]
    }

    pub fn render(&self, event: &CanonicalEvent) -> Result<String> {
        self.template_for(event.event_type()).render(event)
    }
}
