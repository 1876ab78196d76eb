// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Output writers for a [`MessageStore`](crate::store::MessageStore).
//!
//! - [`html`] renders a browsable document set with inline media
//! - [`transcript`] serializes the store back into a WhatsApp `_chat.txt`
//!
//! Both writers name attachments through an [`AttachmentNamer`] and can
//! copy or move the attachment files next to their output.

pub mod emoji;
pub mod html;
pub mod transcript;

use crate::input::{InputError, Sources};
use crate::message::{Message, SourceId};
use chrono::{NaiveDate, NaiveDateTime};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Error type for output failures.
#[derive(Debug, Snafu)]
pub enum WriteError {
    /// An output file could not be written.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    Write {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file could not be copied into the output directory.
    #[snafu(display("failed to copy {}: {source}", path.display()))]
    Copy {
        /// The file being copied.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An attachment could not be copied or moved.
    #[snafu(display("failed to transfer attachment {name}: {source}"))]
    Attachment {
        /// The attachment name.
        name: String,
        /// The underlying input error.
        source: InputError,
    },

    /// A message refers to an attachment but was never stored with a source.
    #[snafu(display("no source for attachment {name} of the message at {timestamp}"))]
    MissingSource {
        /// The attachment name.
        name: String,
        /// Timestamp of the message.
        timestamp: NaiveDateTime,
    },

    /// The emoji directory could not be used.
    #[snafu(display("{source}"))]
    Emoji {
        /// The underlying emoji error.
        source: emoji::EmojiError,
    },
}

/// What happens to attachment files when writing output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttachmentPolicy {
    /// Only reference attachments.
    #[default]
    Leave,
    /// Copy attachments into the output directory.
    Copy,
    /// Move attachments into the output directory.
    ///
    /// Not possible for archives.
    Move,
}

/// Assigns output filenames to attachments.
///
/// Names are either the attachment's own basename or, when renaming,
/// `YYYY-MM-DD-NNNNN.ext` from the message date and a running counter. An
/// attachment referenced again gets the name it was first given.
#[derive(Debug, Default)]
pub struct AttachmentNamer {
    rename: bool,
    counter: u32,
    names: HashMap<(Option<SourceId>, String), String>,
}

impl AttachmentNamer {
    /// Creates a namer; `rename` selects date based names.
    #[must_use]
    pub fn new(rename: bool) -> Self {
        Self {
            rename,
            ..Self::default()
        }
    }

    /// Output filename for `name`, and whether it was newly assigned.
    pub fn name(&mut self, origin: Option<SourceId>, date: NaiveDate, name: &str) -> (String, bool) {
        let key = (origin, name.to_owned());
        if let Some(existing) = self.names.get(&key) {
            return (existing.clone(), false);
        }

        let path = Path::new(name);
        let output = if self.rename {
            self.counter += 1;
            let extension = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            format!("{}-{:05}{extension}", date.format("%Y-%m-%d"), self.counter)
        } else {
            path.file_name()
                .map_or_else(|| name.to_owned(), |base| base.to_string_lossy().into_owned())
        };

        self.names.insert(key, output.clone());
        (output, true)
    }
}

/// Copies or moves the attachment `name` of `message` to `dest`.
fn transfer(
    sources: &mut Sources,
    policy: AttachmentPolicy,
    message: &Message,
    name: &str,
    dest: &Path,
) -> Result<(), WriteError> {
    if policy == AttachmentPolicy::Leave {
        return Ok(());
    }

    let input = message
        .origin()
        .and_then(|id| sources.get_mut(id))
        .context(MissingSourceSnafu {
            name,
            timestamp: message.timestamp(),
        })?;

    match policy {
        AttachmentPolicy::Copy => input.copy_attachment(name, dest),
        AttachmentPolicy::Move => input.move_attachment(name, dest),
        AttachmentPolicy::Leave => Ok(()),
    }
    .context(AttachmentSnafu { name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Content;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn keeps_basename_without_renaming() {
        let mut namer = AttachmentNamer::new(false);
        let (name, new) = namer.name(None, day(2020, 1, 1), "Media/IMG-1.jpg");
        assert_eq!(name, "IMG-1.jpg");
        assert!(new);
    }

    #[test]
    fn renames_with_date_and_counter() {
        let mut namer = AttachmentNamer::new(true);
        assert_eq!(namer.name(None, day(2020, 1, 1), "a.jpg").0, "2020-01-01-00001.jpg");
        assert_eq!(namer.name(None, day(2020, 1, 2), "b.opus").0, "2020-01-02-00002.opus");
        assert_eq!(namer.name(None, day(2020, 1, 2), "noext").0, "2020-01-02-00003");
    }

    #[test]
    fn repeated_attachment_keeps_its_name() {
        let mut namer = AttachmentNamer::new(true);
        let first = namer.name(None, day(2020, 1, 1), "a.jpg");
        let again = namer.name(None, day(2020, 5, 5), "a.jpg");
        assert_eq!(first.0, again.0);
        assert!(!again.1);
    }

    #[test]
    fn transfer_needs_a_source() {
        let mut sources = Sources::new();
        let timestamp = day(2020, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        let message = Message::sent(timestamp, Content::attachment("a.jpg"));

        transfer(&mut sources, AttachmentPolicy::Leave, &message, "a.jpg", Path::new("x")).unwrap();
        let err = transfer(&mut sources, AttachmentPolicy::Copy, &message, "a.jpg", Path::new("x")).unwrap_err();
        assert!(matches!(err, WriteError::MissingSource { .. }));
    }
}
