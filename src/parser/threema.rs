// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Threema text exports.
//!
//! Lines start with `>>>` for outgoing and `<<<` for incoming messages,
//! followed by a localized date:
//!
//! ```text
//! >>> 12. March 2020 at 10:11:12 CET: Hello
//! <<< 12. März 2020 um 10:12:00 MEZ: Bild (6c8a4e0b.jpg)
//! ```
//!
//! Month names are accepted in English, German, Spanish and French.
//! Incoming messages carry no sender name, so their sender is `<<<`.

use super::{
    InvalidTimestampSnafu, MissingDirectionSnafu, MissingSeparatorSnafu, MissingTimestampSnafu, ParseError,
    UnrecognizedMonthSnafu, lines,
};
use crate::message::{Content, DateRange, Message};
use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use snafu::prelude::*;
use std::sync::LazyLock;

/// Line prefix of outgoing messages.
pub const OUTGOING: &str = ">>>";

/// Line prefix of incoming messages, also used as their sender.
pub const INCOMING: &str = "<<<";

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\. (\S+) (\d{4})\D*(\d{1,2}):(\d{2}):(\d{2})").expect("valid timestamp pattern")
});

static ATTACHMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S+ \(([A-Za-z0-9_\-]+\.[A-Za-z0-9]+)\)$").expect("valid attachment pattern")
});

const MONTHS: [[&str; 12]; 4] = [
    [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ],
    [
        "januar",
        "februar",
        "märz",
        "april",
        "mai",
        "juni",
        "juli",
        "august",
        "september",
        "oktober",
        "november",
        "dezember",
    ],
    [
        "enero",
        "febrero",
        "marzo",
        "abril",
        "mayo",
        "junio",
        "julio",
        "agosto",
        "septiembre",
        "octubre",
        "noviembre",
        "diciembre",
    ],
    [
        "janvier",
        "février",
        "mars",
        "avril",
        "mai",
        "juin",
        "juillet",
        "août",
        "septembre",
        "octobre",
        "novembre",
        "décembre",
    ],
];

/// Parses a Threema text export, dropping messages outside `range`.
///
/// # Errors
///
/// Returns an error for the first line that cannot be parsed.
pub fn parse(text: &str, range: &DateRange) -> Result<Vec<Message>, ParseError> {
    let mut messages = Vec::new();
    for (number, line) in lines(text) {
        let message = parse_line(number, line)?;
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
/// Returns an error if the direction marker, the timestamp or the message
/// separator is missing, or the month name is unknown.
pub fn parse_line(number: usize, line: &str) -> Result<Message, ParseError> {
    let outgoing = line.starts_with(OUTGOING);
    ensure!(
        outgoing || line.starts_with(INCOMING),
        MissingDirectionSnafu { line: number, text: line }
    );

    let rest = line[OUTGOING.len()..].trim_start();
    let caps = TIMESTAMP.captures(rest).context(MissingTimestampSnafu {
        line: number,
        text: line,
    })?;
    let month = month_number(&caps[2]).context(UnrecognizedMonthSnafu {
        line: number,
        name: &caps[2],
    })?;
    let timestamp = timestamp(&caps, month).context(InvalidTimestampSnafu {
        line: number,
        text: line,
    })?;

    // A time zone name sits between the time and the separator.
    let after = &rest[caps.get(0).map_or(0, |m| m.end())..];
    let (_, body) = after.split_once(':').context(MissingSeparatorSnafu {
        line: number,
        text: line,
    })?;

    let content = content(body);
    if outgoing {
        Ok(Message::sent(timestamp, content))
    } else {
        Ok(Message::received(timestamp, INCOMING, content))
    }
}

/// Month number (1-12) for a month name or abbreviation.
///
/// Matching ignores case and a trailing period. An abbreviation needs at
/// least three letters and must not be ambiguous across languages.
#[must_use]
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim_end_matches('.').to_lowercase();

    let index = MONTHS
        .iter()
        .find_map(|table| table.iter().position(|month| *month == name))
        .or_else(|| {
            if name.chars().count() < 3 {
                return None;
            }
            let mut candidates = MONTHS
                .iter()
                .filter_map(|table| table.iter().position(|month| month.starts_with(&name)));
            let first = candidates.next()?;
            candidates.all(|other| other == first).then_some(first)
        })?;

    u32::try_from(index + 1).ok()
}

fn timestamp(caps: &Captures<'_>, month: u32) -> Option<NaiveDateTime> {
    let field = |i: usize| caps[i].parse::<u32>().ok();
    let year = caps[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, field(1)?)?.and_hms_opt(field(4)?, field(5)?, field(6)?)
}

fn content(body: &str) -> Content {
    let body = body.trim();
    ATTACHMENT
        .captures(body)
        .map_or_else(|| Content::text(body), |caps| Content::attachment(&caps[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parses_outgoing_message() {
        let msg = parse_line(1, ">>> 12. March 2020 at 10:11:12 CET: Hello").unwrap();
        assert_eq!(msg.kind(), MessageKind::Sent);
        assert_eq!(msg.timestamp(), at(2020, 3, 12, 10, 11, 12));
        assert_eq!(msg.text(), Some("Hello"));
    }

    #[test]
    fn parses_incoming_german_message() {
        let msg = parse_line(1, "<<< 1. Januar 2021 um 08:00:05 MEZ: Hallo").unwrap();
        assert_eq!(msg.kind(), MessageKind::Received);
        assert_eq!(msg.sender(), Some("<<<"));
        assert_eq!(msg.timestamp(), at(2021, 1, 1, 8, 0, 5));
    }

    #[test]
    fn accepts_multi_word_connector() {
        let msg = parse_line(1, "<<< 5. mayo 2022 a las 21:30:00 CEST: Hola").unwrap();
        assert_eq!(msg.timestamp(), at(2022, 5, 5, 21, 30, 0));
    }

    #[test]
    fn body_may_contain_colons() {
        let msg = parse_line(1, ">>> 1. June 2020 at 10:00:00 CEST: Meet at 12:30").unwrap();
        assert_eq!(msg.text(), Some("Meet at 12:30"));
    }

    #[test]
    fn recognizes_attachment() {
        let msg = parse_line(1, "<<< 12. März 2020 um 10:12:00 MEZ: Bild (6c8a4e0b.jpg)").unwrap();
        assert_eq!(msg.attachment(), Some("6c8a4e0b.jpg"));
    }

    #[test]
    fn month_names_and_abbreviations() {
        assert_eq!(month_number("March"), Some(3));
        assert_eq!(month_number("märz"), Some(3));
        assert_eq!(month_number("DÉCEMBRE"), Some(12));
        assert_eq!(month_number("Sept."), Some(9));
        assert_eq!(month_number("dic"), Some(12));
        assert_eq!(month_number("mai"), Some(5));
        // juin and juillet
        assert_eq!(month_number("jui"), None);
        assert_eq!(month_number("ma"), None);
        assert_eq!(month_number("smarch"), None);
    }

    #[test]
    fn rejects_unknown_month() {
        let err = parse_line(4, ">>> 1. Brumaire 2020 at 10:00:00 CET: x").unwrap_err();
        match err {
            ParseError::UnrecognizedMonth { line, name } => {
                assert_eq!(line, 4);
                assert_eq!(name, "Brumaire");
            }
            other => panic!("Expected UnrecognizedMonth, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_direction() {
        let err = parse_line(1, "1. March 2020 at 10:00:00 CET: x").unwrap_err();
        assert!(matches!(err, ParseError::MissingDirection { .. }));
    }

    #[test]
    fn rejects_missing_separator() {
        let err = parse_line(1, ">>> 1. March 2020 at 10:00:00 CET").unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator { .. }));
    }

    #[test]
    fn parses_document_and_filters() {
        let text = ">>> 1. March 2020 at 10:00:00 CET: a\r\n\r\n<<< 2. April 2020 at 11:00:00 CEST: b\r\n";
        let all = parse(text, &DateRange::default()).unwrap();
        assert_eq!(all.len(), 2);

        let to = NaiveDate::from_ymd_opt(2020, 3, 31);
        let march = parse(text, &DateRange::new(None, to)).unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].text(), Some("a"));
    }
}
