// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! The canonical message model shared by every transcript format.
//!
//! Parsers produce [`Message`] values, the [`MessageStore`](crate::store::MessageStore)
//! indexes them and the renderers read them back. A message body is a
//! [`Content`], so a message can never carry both text and an attachment.
//!
//! # Example
//!
//! ```
//! use chatbook::message::{Content, Message, MessageKind};
//! use chrono::NaiveDate;
//!
//! let timestamp = NaiveDate::from_ymd_opt(2020, 6, 15)
//!     .unwrap()
//!     .and_hms_opt(18, 30, 0)
//!     .unwrap();
//!
//! let message = Message::received(timestamp, "Alice", Content::text("Hi!"));
//! assert_eq!(message.kind(), MessageKind::Received);
//! assert_eq!(message.text(), Some("Hi!"));
//! assert!(message.attachment().is_none());
//! ```

use chrono::{NaiveDate, NaiveDateTime};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Written by the owner of the exported phone ("me").
    Sent,
    /// Written by another participant.
    Received,
    /// Generated by the messaging app (group changes, encryption notices).
    System,
    /// Tombstone for a message that was removed after sending.
    Deleted,
}

/// The body of a message: text, an attachment reference, or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Content {
    /// Plain message text, trimmed.
    Text(String),
    /// Filename of an attachment, relative to the originating container.
    Attachment(String),
    /// Neither text nor attachment, e.g. an attachment whose caption the
    /// exporting app dropped.
    Empty,
}

impl Content {
    /// Creates text content, or [`Content::Empty`] if the trimmed text is empty.
    pub fn text(text: impl AsRef<str>) -> Self {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_owned())
        }
    }

    /// Creates attachment content, or [`Content::Empty`] for a blank name.
    pub fn attachment(name: impl AsRef<str>) -> Self {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Attachment(trimmed.to_owned())
        }
    }

    /// Returns `true` for [`Content::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Handle of the input container a message was read from.
///
/// Resolved through [`Sources`](crate::input::Sources) when attachment
/// bytes are needed. It is not part of message identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub(crate) usize);

/// A single normalized chat message.
#[derive(Debug, Clone)]
pub struct Message {
    timestamp: NaiveDateTime,
    kind: MessageKind,
    sender: Option<String>,
    content: Content,
    origin: Option<SourceId>,
}

impl Message {
    /// A message written by "me".
    #[must_use]
    pub const fn sent(timestamp: NaiveDateTime, content: Content) -> Self {
        Self {
            timestamp,
            kind: MessageKind::Sent,
            sender: None,
            content,
            origin: None,
        }
    }

    /// A message written by `sender` (the raw, unmapped sender id).
    pub fn received(timestamp: NaiveDateTime, sender: impl Into<String>, content: Content) -> Self {
        Self {
            timestamp,
            kind: MessageKind::Received,
            sender: Some(sender.into()),
            content,
            origin: None,
        }
    }

    /// A message generated by the messaging app itself.
    ///
    /// System messages always carry text.
    pub fn system(timestamp: NaiveDateTime, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind: MessageKind::System,
            sender: None,
            content: Content::Text(text.into().trim().to_owned()),
            origin: None,
        }
    }

    /// A tombstone for a removed message, with whatever content survived.
    #[must_use]
    pub const fn deleted(timestamp: NaiveDateTime, content: Content) -> Self {
        Self {
            timestamp,
            kind: MessageKind::Deleted,
            sender: None,
            content,
            origin: None,
        }
    }

    /// When the message was sent, in local time.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Calendar day of the message.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// The message kind.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The sender, present only for [`MessageKind::Received`].
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// The message body.
    #[must_use]
    pub const fn content(&self) -> &Content {
        &self.content
    }

    /// The message text, if the body is text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The attachment filename, if the body is an attachment.
    #[must_use]
    pub fn attachment(&self) -> Option<&str> {
        match &self.content {
            Content::Attachment(name) => Some(name),
            _ => None,
        }
    }

    /// The container this message was read from, once stored.
    #[must_use]
    pub const fn origin(&self) -> Option<SourceId> {
        self.origin
    }

    /// Returns `true` for messages written by a chat participant.
    #[must_use]
    pub const fn is_user_message(&self) -> bool {
        matches!(self.kind, MessageKind::Sent | MessageKind::Received)
    }

    pub(crate) fn set_sender(&mut self, sender: String) {
        if self.kind == MessageKind::Received {
            self.sender = Some(sender);
        }
    }

    pub(crate) const fn set_origin(&mut self, origin: SourceId) {
        self.origin = Some(origin);
    }
}

/// An inclusive calendar-date filter with optional bounds.
///
/// Only the date component of a timestamp takes part in filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// First day to keep, if bounded.
    pub from: Option<NaiveDate>,
    /// Last day to keep, if bounded.
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// A range with the given bounds.
    #[must_use]
    pub const fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// A range without bounds.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { from: None, to: None }
    }

    /// Returns `true` if `date` lies within the bounds.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    /// Returns `true` if any day of `first..=last` lies within the bounds.
    #[must_use]
    pub fn overlaps(&self, first: NaiveDate, last: NaiveDate) -> bool {
        self.from.is_none_or(|from| last >= from) && self.to.is_none_or(|to| first <= to)
    }
}
