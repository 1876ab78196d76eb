// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Workbooks written by Elcomsoft Explorer for WhatsApp.
//!
//! All chats of a phone share the worksheet `Messages`. The first two rows
//! are headers; every further row is one message. Message text and
//! attachment paths are stored as `HYPERLINK` formulas, so their display
//! strings are read from the formula rather than the cell value.

use super::{
    ChatNotFoundSnafu, MalformedHyperlinkSnafu, MissingHeaderSnafu, MissingRowTimestampSnafu, MissingWorksheetSnafu,
    ParseError, UnknownMessageTypeSnafu, WorkbookSnafu,
};
use crate::message::{Content, DateRange, Message};
use calamine::{Data, DataType, Range, Reader, Xlsx};
use chrono::{NaiveDateTime, SubsecRound};
use snafu::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

/// Name of the worksheet holding the messages, also expected in cell B1.
pub const SHEET_NAME: &str = "Messages";

const HEADER_ROWS: u32 = 2;

/// Column indexes of the message rows.
mod column {
    pub const CHAT: u32 = 1;
    pub const SENDER: u32 = 3;
    pub const DIRECTION: u32 = 5;
    pub const TEXT: u32 = 7;
    pub const TIMESTAMP: u32 = 8;
    pub const TYPE: u32 = 10;
    pub const ATTACHMENT: u32 = 12;
    pub const LOCATION: u32 = 14;
}

/// Chat names mapped to their participants.
pub type ChatNames = BTreeMap<String, BTreeSet<String>>;

/// The message worksheet of a workbook.
#[derive(Debug)]
pub struct MessageSheet {
    values: Range<Data>,
    formulas: Range<String>,
}

impl MessageSheet {
    /// Decodes an `.xlsx` workbook.
    ///
    /// # Errors
    ///
    /// Returns an error if the workbook cannot be decoded, or lacks the
    /// `Messages` worksheet or its header.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ParseError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).context(WorkbookSnafu)?;
        ensure!(
            workbook.sheet_names().iter().any(|name| name == SHEET_NAME),
            MissingWorksheetSnafu { name: SHEET_NAME }
        );

        let values = workbook.worksheet_range(SHEET_NAME).context(WorkbookSnafu)?;
        let formulas = workbook.worksheet_formula(SHEET_NAME).context(WorkbookSnafu)?;
        Self::from_ranges(values, formulas)
    }

    /// Builds a sheet from already decoded cell values and formulas.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingHeader`] unless cell B1 reads `Messages`.
    pub fn from_ranges(values: Range<Data>, formulas: Range<String>) -> Result<Self, ParseError> {
        let header = values.get_value((0, 1)).and_then(|cell| cell.get_string());
        ensure!(
            header == Some(SHEET_NAME),
            MissingHeaderSnafu {
                cell: "B1",
                expected: SHEET_NAME,
            }
        );
        Ok(Self { values, formulas })
    }

    /// Every chat in the sheet, with the senders that appear in it.
    ///
    /// A sender whose id starts with the chat name is the chat itself (as in
    /// group chats) and is not listed as a participant.
    #[must_use]
    pub fn chat_names(&self) -> ChatNames {
        let mut chats = ChatNames::new();
        for row in self.rows() {
            if self.cell_text(row, column::TEXT).is_none() && self.formula(row, column::ATTACHMENT).is_none() {
                continue;
            }
            let Some(name) = self.chat_name(row) else {
                continue;
            };
            let sender = self.cell_text(row, column::SENDER);
            let participants = chats.entry(name.clone()).or_default();
            if let Some(sender) = sender
                && !sender.starts_with(&name)
            {
                participants.insert(sender);
            }
        }
        chats
    }

    /// Participants of the first chat whose name contains `fragment`.
    #[must_use]
    pub fn participants(&self, fragment: &str) -> Option<BTreeSet<String>> {
        self.chat_names()
            .into_iter()
            .find(|(name, _)| name.contains(fragment))
            .map(|(_, participants)| participants)
    }

    /// Messages of every chat whose name contains `chat`, within `range`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::ChatNotFound`] if no row belongs to a matching
    /// chat, or an error for the first matching row that cannot be parsed.
    pub fn messages(&self, chat: &str, range: &DateRange) -> Result<Vec<Message>, ParseError> {
        let mut found = false;
        let mut messages = Vec::new();

        for row in self.rows() {
            if !self.chat_name(row).is_some_and(|name| name.contains(chat)) {
                continue;
            }
            found = true;
            if let Some(message) = self.message(row)?
                && range.contains(message.date())
            {
                messages.push(message);
            }
        }

        ensure!(found, ChatNotFoundSnafu { chat });
        Ok(messages)
    }

    /// Absolute indexes of the message rows.
    fn rows(&self) -> impl Iterator<Item = u32> {
        let first = self.values.start().map_or(0, |(row, _)| row).max(HEADER_ROWS);
        let last = self.values.end().map(|(row, _)| row);
        last.into_iter().flat_map(move |last| first..=last)
    }

    fn message(&self, row: u32) -> Result<Option<Message>, ParseError> {
        let number = row + 1;
        let label = self.cell_text(row, column::TYPE).unwrap_or_default();
        let timestamp = self
            .values
            .get_value((row, column::TIMESTAMP))
            .and_then(cell_timestamp)
            .context(MissingRowTimestampSnafu { row: number })?;

        let mut text = match self.formula(row, column::TEXT) {
            Some(formula) => Some(hyperlink_text(formula, number, "H")?),
            None => self.cell_text(row, column::TEXT),
        };
        let attachment = self
            .formula(row, column::ATTACHMENT)
            .map(|formula| hyperlink_text(formula, number, "M"))
            .transpose()?
            .map(|path| path.replace('\\', "/"));

        if label.replace(' ', "").contains("WhatsApp") {
            if label.contains("Location") {
                text = self.cell_text(row, column::LOCATION);
            }
            let content = content(text, attachment);
            if content.is_empty() {
                return Ok(None);
            }
            let incoming = self.cell_text(row, column::DIRECTION).as_deref() == Some("Incoming");
            Ok(Some(if incoming {
                let sender = self.cell_text(row, column::SENDER).unwrap_or_default();
                Message::received(timestamp, sender, content)
            } else {
                Message::sent(timestamp, content)
            }))
        } else if label == "System" {
            Ok(text.map(|text| Message::system(timestamp, text)))
        } else if label == "Deleted" {
            Ok(Some(Message::deleted(timestamp, content(text, attachment))))
        } else {
            UnknownMessageTypeSnafu { row: number, label }.fail()
        }
    }

    /// Chat name of a row, cut at the first parenthesis.
    fn chat_name(&self, row: u32) -> Option<String> {
        let name = self.cell_text(row, column::CHAT)?;
        let name = name.split_once('(').map_or(name.as_str(), |(head, _)| head);
        Some(name.trim().to_owned())
    }

    /// Trimmed, non-empty cell value as text.
    fn cell_text(&self, row: u32, col: u32) -> Option<String> {
        let text = match self.values.get_value((row, col))? {
            Data::Empty => return None,
            Data::String(s) => s.trim().to_owned(),
            other => other.to_string().trim().to_owned(),
        };
        (!text.is_empty()).then_some(text)
    }

    fn formula(&self, row: u32, col: u32) -> Option<&str> {
        self.formulas
            .get_value((row, col))
            .map(String::as_str)
            .filter(|formula| !formula.trim().is_empty())
    }
}

/// Attachment wins over text, as in the app's own export.
fn content(text: Option<String>, attachment: Option<String>) -> Content {
    match (text, attachment) {
        (_, Some(attachment)) => Content::attachment(attachment),
        (Some(text), None) => Content::text(text),
        (None, None) => Content::Empty,
    }
}

/// Display string of a `HYPERLINK("target", "label")` formula.
///
/// The first quoted argument is returned, with doubled quotes unescaped.
fn hyperlink_text(formula: &str, row: u32, column: &'static str) -> Result<String, ParseError> {
    let expr = formula.trim_start().trim_start_matches('=').trim_start();
    let is_hyperlink = expr
        .get(..9)
        .is_some_and(|name| name.eq_ignore_ascii_case("HYPERLINK"));

    is_hyperlink
        .then(|| first_quoted(expr))
        .flatten()
        .context(MalformedHyperlinkSnafu { row, column, formula })
}

fn first_quoted(expr: &str) -> Option<String> {
    let (_, rest) = expr.split_once('"')?;
    let mut out = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
            } else {
                return Some(out);
            }
        } else {
            out.push(c);
        }
    }
    None
}

fn cell_timestamp(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::String(text) | Data::DateTimeIso(text) => parse_timestamp_text(text),
        other => other.as_datetime().map(|ts| ts.round_subsecs(0)),
    }
}

fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}
