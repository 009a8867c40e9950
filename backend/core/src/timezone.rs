//! Display-timezone parsing.
//!
//! Zones are fixed UTC offsets: `UTC`, `GMT`, `Z`, `+HH:MM`, `-HHMM` or `+HH`.

use chrono::{FixedOffset, Offset, Utc};

use crate::error::{ChanlogError, Result};

pub fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parse a configured zone into a fixed offset.
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset> {
    let s = input.trim();
    if s.is_empty() || ["utc", "gmt", "z"].iter().any(|z| s.eq_ignore_ascii_case(z)) {
        return Ok(utc());
    }

    let invalid = || ChanlogError::Config(format!("invalid UTC offset '{input}'"));

    let (sign, rest) = match s.as_bytes()[0] {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
