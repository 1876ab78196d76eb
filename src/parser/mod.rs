// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Transcript parsing for the supported chat export formats.
//!
//! Three formats are understood:
//!
//! - WhatsApp's own text export (`_chat.txt`), see [`whatsapp`]
//! - Threema's text export, whose lines start with `>>>` or `<<<`, see [`threema`]
//! - The `.xlsx` workbook written by Elcomsoft Explorer for WhatsApp, see
//!   [`spreadsheet`]
//!
//! [`detect`] picks the format from the transcript payload and returns a
//! [`Transcript`], whose [`parse`](Transcript::parse) produces the canonical
//! [`Message`] sequence.
//!
//! # Example
//!
//! ```
//! use chatbook::input::Payload;
//! use chatbook::message::MessageKind;
//! use chatbook::parser::{detect, Format, ParseOptions};
//!
//! let text = "[05.12.24, 09:15:00] Alice: Morning!\r\n\
//!             [05.12.24, 09:16:30] Bob: Hi Alice\r\n";
//!
//! let transcript = detect(Payload::Text(text.into())).unwrap();
//! assert_eq!(transcript.format(), Format::WhatsApp);
//!
//! let options = ParseOptions {
//!     me: Some("Bob".into()),
//!     ..Default::default()
//! };
//! let messages = transcript.parse(&options).unwrap();
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[0].sender(), Some("Alice"));
//! assert_eq!(messages[1].kind(), MessageKind::Sent);
//! ```

pub mod spreadsheet;
pub mod threema;
pub mod whatsapp;

use crate::input::{Input, InputError, Payload};
use crate::message::{DateRange, Message};
use snafu::prelude::*;
use spreadsheet::{ChatNames, MessageSheet};
use std::collections::BTreeSet;
use std::fmt;

/// Error type for transcript parsing failures.
///
/// Line and row numbers are 1-based.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// The transcript could not be read from its input.
    #[snafu(display("failed to read transcript: {source}"))]
    Read {
        /// The underlying input error.
        source: InputError,
    },

    /// A text line does not contain a timestamp.
    #[snafu(display("line {line}: no timestamp found in {text:?}"))]
    MissingTimestamp {
        /// Line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A timestamp names a date or time that does not exist.
    #[snafu(display("line {line}: invalid date or time in {text:?}"))]
    InvalidTimestamp {
        /// Line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A Threema line does not start with a direction marker.
    #[snafu(display("line {line}: expected a >>> or <<< marker in {text:?}"))]
    MissingDirection {
        /// Line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A Threema line has no `:` between timestamp and message.
    #[snafu(display("line {line}: no message separator after the timestamp in {text:?}"))]
    MissingSeparator {
        /// Line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A month name is not known in any supported language.
    #[snafu(display("line {line}: unrecognized month name {name:?}"))]
    UnrecognizedMonth {
        /// Line number.
        line: usize,
        /// The unknown month name.
        name: String,
    },

    /// A message starts like an attachment but does not name a file.
    #[snafu(display("line {line}: malformed attachment marker in {text:?}"))]
    MalformedAttachment {
        /// Line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// The workbook could not be decoded.
    #[snafu(display("failed to read workbook: {source}"))]
    Workbook {
        /// The underlying spreadsheet error.
        source: calamine::XlsxError,
    },

    /// The workbook lacks the expected worksheet.
    #[snafu(display("worksheet {name:?} not found"))]
    MissingWorksheet {
        /// The expected worksheet name.
        name: &'static str,
    },

    /// A header cell does not hold the expected text.
    #[snafu(display("expected {expected:?} in cell {cell}"))]
    MissingHeader {
        /// The cell reference, e.g. `B1`.
        cell: &'static str,
        /// The expected cell text.
        expected: &'static str,
    },

    /// A hyperlink column holds a formula of an unexpected shape.
    #[snafu(display("row {row}: expected a HYPERLINK formula in column {column}, found {formula:?}"))]
    MalformedHyperlink {
        /// Row number.
        row: u32,
        /// Column letter.
        column: &'static str,
        /// The formula found.
        formula: String,
    },

    /// A row lacks a usable timestamp.
    #[snafu(display("row {row}: missing or invalid timestamp"))]
    MissingRowTimestamp {
        /// Row number.
        row: u32,
    },

    /// A row has a message type that is not understood.
    #[snafu(display("row {row}: unknown message type {label:?}"))]
    UnknownMessageType {
        /// Row number.
        row: u32,
        /// The message type label.
        label: String,
    },

    /// A spreadsheet was parsed without selecting a chat.
    #[snafu(display("select a chat; available chats: {}", available.join(", ")))]
    ChatNotSelected {
        /// Names of the chats in the workbook.
        available: Vec<String>,
    },

    /// No chat matches the requested name.
    #[snafu(display("no chat matching {chat:?}"))]
    ChatNotFound {
        /// The requested chat name fragment.
        chat: String,
    },

    /// Chat discovery was requested for a text transcript.
    #[snafu(display("chat names are only available for spreadsheet transcripts"))]
    NotASpreadsheet,
}

/// A supported transcript format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// WhatsApp text export.
    WhatsApp,
    /// Threema text export.
    Threema,
    /// Elcomsoft Explorer for WhatsApp workbook.
    Spreadsheet,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WhatsApp => "WhatsApp",
            Self::Threema => "Threema",
            Self::Spreadsheet => "spreadsheet",
        })
    }
}

/// Options shared by all parsers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Sender id (or part of it) of the exporting user.
    ///
    /// Only used by the WhatsApp text format, where messages by this sender
    /// become [`MessageKind::Sent`](crate::message::MessageKind::Sent).
    pub me: Option<String>,

    /// Only messages on days within this range are returned.
    pub range: DateRange,

    /// Chat name fragment selecting one chat of a spreadsheet.
    pub chat: Option<String>,
}

/// A transcript whose format has been detected.
#[derive(Debug)]
pub enum Transcript {
    /// A WhatsApp text export.
    WhatsApp(String),
    /// A Threema text export.
    Threema(String),
    /// An Elcomsoft Explorer for WhatsApp workbook.
    Spreadsheet(MessageSheet),
}

/// Line prefixes of Threema exports, for outgoing and incoming messages.
const THREEMA_MARKERS: [&str; 2] = [threema::OUTGOING, threema::INCOMING];

/// Detects the transcript format of `payload`.
///
/// Workbooks are spreadsheets; text starting with a Threema direction
/// marker is Threema; any other text is treated as a WhatsApp export.
///
/// # Errors
///
/// Returns an error if a workbook cannot be decoded or lacks the expected
/// worksheet.
pub fn detect(payload: Payload) -> Result<Transcript, ParseError> {
    match payload {
        Payload::Spreadsheet(bytes) => MessageSheet::from_bytes(bytes).map(Transcript::Spreadsheet),
        Payload::Text(text) => {
            let start = text.trim_start_matches('\u{feff}');
            if THREEMA_MARKERS.iter().any(|m| start.starts_with(m)) {
                Ok(Transcript::Threema(text))
            } else {
                Ok(Transcript::WhatsApp(text))
            }
        }
    }
}

/// Reads the transcript of `input` and detects its format.
///
/// # Errors
///
/// Returns an error if the transcript cannot be read or decoded.
pub fn open(input: &mut Input) -> Result<Transcript, ParseError> {
    detect(input.read_all().context(ReadSnafu)?)
}

/// Reads and parses the transcript of `input`.
///
/// # Errors
///
/// Returns an error if the transcript cannot be read, or if any line or row
/// cannot be parsed.
pub fn parse(input: &mut Input, options: &ParseOptions) -> Result<Vec<Message>, ParseError> {
    open(input)?.parse(options)
}

impl Transcript {
    /// The detected format.
    #[must_use]
    pub const fn format(&self) -> Format {
        match self {
            Self::WhatsApp(_) => Format::WhatsApp,
            Self::Threema(_) => Format::Threema,
            Self::Spreadsheet(_) => Format::Spreadsheet,
        }
    }

    /// Parses the transcript into messages, in transcript order.
    ///
    /// For spreadsheets, `options.chat` selects the chat.
    ///
    /// # Errors
    ///
    /// Returns an error on the first line or row that cannot be parsed, or
    /// if no chat (or no matching chat) is selected for a spreadsheet.
    pub fn parse(&self, options: &ParseOptions) -> Result<Vec<Message>, ParseError> {
        match self {
            Self::WhatsApp(text) => whatsapp::parse(text, options.me.as_deref(), &options.range),
            Self::Threema(text) => threema::parse(text, &options.range),
            Self::Spreadsheet(sheet) => {
                let chat = options.chat.as_deref().with_context(|| ChatNotSelectedSnafu {
                    available: sheet.chat_names().into_keys().collect::<Vec<_>>(),
                })?;
                sheet.messages(chat, &options.range)
            }
        }
    }

    /// Every chat of a spreadsheet with its participants.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NotASpreadsheet`] for text transcripts.
    pub fn chat_names(&self) -> Result<ChatNames, ParseError> {
        match self {
            Self::Spreadsheet(sheet) => Ok(sheet.chat_names()),
            _ => NotASpreadsheetSnafu.fail(),
        }
    }

    /// Participants of the first spreadsheet chat whose name contains `chat`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NotASpreadsheet`] for text transcripts and
    /// [`ParseError::ChatNotFound`] if no chat matches.
    pub fn participants(&self, chat: &str) -> Result<BTreeSet<String>, ParseError> {
        match self {
            Self::Spreadsheet(sheet) => sheet
                .participants(chat)
                .context(ChatNotFoundSnafu { chat }),
            _ => NotASpreadsheetSnafu.fail(),
        }
    }
}

/// Splits a text transcript into numbered, non-blank lines.
///
/// Messages are separated by CR LF; a bare LF belongs to a multi-line
/// message.
fn lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.trim_start_matches('\u{feff}')
        .split("\r\n")
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    #[test]
    fn detects_whatsapp_by_default() {
        let transcript = detect(Payload::Text("01.01.20, 10:00:00 Bob: hi\r\n".into())).unwrap();
        assert_eq!(transcript.format(), Format::WhatsApp);
    }

    #[test]
    fn detects_threema_by_marker() {
        for start in [">>> 1. January 2020", "<<< 1. January 2020"] {
            let transcript = detect(Payload::Text(start.into())).unwrap();
            assert_eq!(transcript.format(), Format::Threema);
        }
    }

    #[test]
    fn detection_ignores_byte_order_mark() {
        let transcript = detect(Payload::Text("\u{feff}<<< x".into())).unwrap();
        assert_eq!(transcript.format(), Format::Threema);
    }

    #[test]
    fn rejects_garbage_workbook() {
        let err = detect(Payload::Spreadsheet(b"not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, ParseError::Workbook { .. }));
    }

    #[test]
    fn chat_names_need_a_spreadsheet() {
        let transcript = detect(Payload::Text(String::new())).unwrap();
        assert!(matches!(
            transcript.chat_names(),
            Err(ParseError::NotASpreadsheet)
        ));
        assert!(matches!(
            transcript.participants("x"),
            Err(ParseError::NotASpreadsheet)
        ));
    }

    #[test]
    fn lines_split_on_crlf_only() {
        let text = "\u{feff}a\r\nb\nc\r\n\r\nd\r\n";
        let got: Vec<_> = lines(text).collect();
        assert_eq!(got, [(1, "a"), (2, "b\nc"), (4, "d")]);
    }

    #[test]
    fn parses_through_transcript() {
        let text = ">>> 3. March 2021 at 08:00:00 CET: Hello\r\n";
        let transcript = detect(Payload::Text(text.into())).unwrap();
        let messages = transcript.parse(&ParseOptions::default()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::Sent);
    }
}
