// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! WhatsApp text exports.
//!
//! Every message occupies one CR LF terminated line:
//!
//! ```text
//! [24.12.19, 18:03:12] Alice: Merry Christmas!
//! 24.12.19, 18:04:00 Bob: <attached: 00000012-PHOTO-2019-12-24-18-04-00.jpg>
//! 24.12.19, 18:05:00 Alice changed the group description
//! ```
//!
//! The date is day first, with a two or four digit year. A line without a
//! `:` after the timestamp is a system message.

use super::{InvalidTimestampSnafu, MalformedAttachmentSnafu, MissingTimestampSnafu, ParseError, lines};
use crate::message::{Content, DateRange, Message};
use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use snafu::prelude::*;
use std::sync::LazyLock;

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[?(\d{1,2})[./](\d{1,2})[./](\d{4}|\d{2}), (\d{1,2}):(\d{2}):(\d{2})\]?:?")
        .expect("valid timestamp pattern")
});

/// Localized attachment notice, e.g. `IMG-20200101-WA0001.jpg <attached>`.
static LABELED_ATTACHMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9A-Za-z_\- ]+\.[A-Za-z0-9]+).*<[^\s>]+>").expect("valid attachment pattern")
});

/// `<attached: NAME>` as written by newer iOS exports.
static ATTACHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<attached: (\S+)>").expect("valid attachment pattern"));

/// Parses a WhatsApp text export.
///
/// Messages whose sender contains `me` become sent messages. Messages on
/// days outside `range` are dropped.
///
/// # Errors
///
/// Returns an error for the first line that cannot be parsed.
pub fn parse(text: &str, me: Option<&str>, range: &DateRange) -> Result<Vec<Message>, ParseError> {
    let mut messages = Vec::new();
    for (number, line) in lines(text) {
        let message = parse_line(number, line, me)?;
        if range.contains(message.date()) {
            messages.push(message);
        }
    }
    Ok(messages)
}

/// Parses a single message line. `number` is used for error reporting.
///
/// # Errors
///
/// Returns an error if the line has no valid timestamp or carries a
/// malformed attachment marker.
pub fn parse_line(number: usize, line: &str, me: Option<&str>) -> Result<Message, ParseError> {
    let caps = TIMESTAMP.captures(line).context(MissingTimestampSnafu {
        line: number,
        text: line,
    })?;
    let timestamp = timestamp(&caps).context(InvalidTimestampSnafu {
        line: number,
        text: line,
    })?;
    let rest = &line[caps.get(0).map_or(0, |m| m.end())..];

    let Some((sender, body)) = rest.split_once(':') else {
        return Ok(Message::system(timestamp, rest));
    };

    let sender = sender.trim();
    let content = content(number, line, body)?;
    if me.is_some_and(|me| !me.is_empty() && sender.contains(me)) {
        Ok(Message::sent(timestamp, content))
    } else {
        Ok(Message::received(timestamp, sender, content))
    }
}

fn timestamp(caps: &Captures<'_>) -> Option<NaiveDateTime> {
    let field = |i: usize| caps[i].parse::<u32>().ok();
    let mut year = caps[3].parse::<i32>().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, field(2)?, field(1)?)?.and_hms_opt(field(4)?, field(5)?, field(6)?)
}

fn content(number: usize, line: &str, body: &str) -> Result<Content, ParseError> {
    let body = body.trim();

    if let Some(caps) = LABELED_ATTACHMENT
        .captures(body)
        .or_else(|| ATTACHED.captures(body))
    {
        return Ok(Content::attachment(&caps[1]));
    }

    ensure!(
        !body.trim_start_matches('\u{200e}').starts_with("<attached:"),
        MalformedAttachmentSnafu { line: number, text: line }
    );
    Ok(Content::text(body))
}
