// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Serialization back into a WhatsApp text export.
//!
//! The output is a `_chat.txt` that the WhatsApp parser reads back, so
//! merged or filtered histories can be converted again later:
//!
//! ```text
//! 15.06.20, 18:30:00 Me: Hi!
//! 15.06.20, 18:31:02 Alice: IMG-20200615-WA0001.jpg <attached>
//! ```

use super::{AttachmentNamer, AttachmentPolicy, WriteError, WriteSnafu, transfer};
use crate::input::Sources;
use crate::message::{Content, Message, MessageKind};
use crate::progress::Progress;
use crate::store::MessageStore;
use snafu::prelude::*;
use std::fmt::Write;
use std::path::Path;

/// Name of the written transcript.
pub const FILE_NAME: &str = "_chat.txt";

/// Configuration for transcript output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptOptions {
    /// Sender name written for sent messages.
    pub me: String,

    /// Whether attachments are copied or moved into the output directory.
    pub attachments: AttachmentPolicy,

    /// Name attachments `YYYY-MM-DD-NNNNN.ext` instead of their basename.
    pub rename_attachments: bool,
}

impl Default for TranscriptOptions {
    fn default() -> Self {
        Self {
            me: "Me".into(),
            attachments: AttachmentPolicy::Leave,
            rename_attachments: false,
        }
    }
}

/// An attachment referenced by the rendered transcript.
#[derive(Debug)]
pub struct AttachmentRef<'a> {
    /// The message carrying the attachment.
    pub message: &'a Message,
    /// Attachment name within its input.
    pub name: &'a str,
    /// Filename used in the transcript.
    pub output: String,
}

/// Renders `messages` as transcript text.
///
/// Messages with neither text nor attachment are skipped. Returns the text
/// and the attachments it names, each listed once.
pub fn render<'a>(
    messages: &[&'a Message],
    options: &TranscriptOptions,
    namer: &mut AttachmentNamer,
) -> (String, Vec<AttachmentRef<'a>>) {
    let mut out = String::new();
    let mut attachments = Vec::new();

    for &message in messages {
        let body = match message.content() {
            Content::Empty => continue,
            Content::Text(text) => text.replace("\r\n", "\n"),
            Content::Attachment(name) => {
                let (output, new) = namer.name(message.origin(), message.date(), name);
                let body = format!("{output} <attached>");
                if new {
                    attachments.push(AttachmentRef { message, name, output });
                }
                body
            }
        };

        write!(out, "{}", message.timestamp().format("%d.%m.%y, %H:%M:%S ")).unwrap();
        match message.kind() {
            MessageKind::Sent => write!(out, "{}: ", options.me).unwrap(),
            MessageKind::Received => write!(out, "{}: ", message.sender().unwrap_or_default()).unwrap(),
            MessageKind::System | MessageKind::Deleted => {}
        }
        write!(out, "{body}\r\n").unwrap();
    }

    (out, attachments)
}

/// Writes all messages of `store` to `_chat.txt` in `out_dir`, then copies
/// or moves the attachments. Returns the number of messages written.
///
/// # Errors
///
/// Returns an error if the transcript cannot be written or an attachment
/// cannot be transferred.
pub fn write(
    store: &MessageStore,
    sources: &mut Sources,
    out_dir: &Path,
    options: &TranscriptOptions,
    progress: &mut dyn Progress,
) -> Result<usize, WriteError> {
    let messages = store.messages(None, None);
    let mut namer = AttachmentNamer::new(options.rename_attachments);
    let path = out_dir.join(FILE_NAME);

    progress.begin(&format!("Writing {} messages to \"{}\"", messages.len(), path.display()));
    let (text, attachments) = render(&messages, options, &mut namer);
    std::fs::write(&path, text).context(WriteSnafu { path: &path })?;
    progress.end();

    if options.attachments != AttachmentPolicy::Leave {
        let verb = if options.attachments == AttachmentPolicy::Copy {
            "Copying"
        } else {
            "Moving"
        };
        let total = attachments.len();
        for (i, attachment) in attachments.iter().enumerate() {
            let base = Path::new(attachment.name)
                .file_name()
                .map_or_else(|| attachment.name.into(), |base| base.to_string_lossy());
            progress.begin(&format!("{verb} attachment {} / {total}, {base}", i + 1));
            transfer(
                sources,
                options.attachments,
                attachment.message,
                attachment.name,
                &out_dir.join(&attachment.output),
            )?;
            progress.end();
        }
    }

    Ok(messages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Input;
    use crate::message::DateRange;
    use crate::parser::whatsapp;
    use crate::progress::Silent;
    use crate::store::SenderMap;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn render_all(messages: &[Message], options: &TranscriptOptions) -> String {
        let refs: Vec<&Message> = messages.iter().collect();
        render(&refs, options, &mut AttachmentNamer::new(options.rename_attachments)).0
    }

    #[test]
    fn writes_each_kind() {
        let messages = [
            Message::sent(at(2020, 6, 15, 18, 30, 0), Content::text("Hi!")),
            Message::received(at(2020, 6, 15, 18, 31, 2), "Alice", Content::text("Hello")),
            Message::system(at(2020, 6, 15, 18, 32, 0), "Alice left"),
        ];
        let text = render_all(&messages, &TranscriptOptions::default());
        assert_eq!(
            text,
            "15.06.20, 18:30:00 Me: Hi!\r\n\
             15.06.20, 18:31:02 Alice: Hello\r\n\
             15.06.20, 18:32:00 Alice left\r\n"
        );
    }

    #[test]
    fn uses_custom_me_label() {
        let messages = [Message::sent(at(2020, 1, 1, 0, 0, 0), Content::text("x"))];
        let options = TranscriptOptions {
            me: "Jane".into(),
            ..TranscriptOptions::default()
        };
        assert_eq!(render_all(&messages, &options), "01.01.20, 00:00:00 Jane: x\r\n");
    }

    #[test]
    fn skips_empty_messages() {
        let messages = [
            Message::deleted(at(2020, 1, 1, 0, 0, 0), Content::Empty),
            Message::sent(at(2020, 1, 1, 0, 0, 1), Content::Empty),
        ];
        assert_eq!(render_all(&messages, &TranscriptOptions::default()), "");
    }

    #[test]
    fn folds_crlf_in_text() {
        let messages = [Message::sent(at(2020, 1, 1, 0, 0, 0), Content::text("a\r\nb"))];
        assert_eq!(
            render_all(&messages, &TranscriptOptions::default()),
            "01.01.20, 00:00:00 Me: a\nb\r\n"
        );
    }

    #[test]
    fn names_attachments() {
        let messages = [
            Message::received(at(2020, 1, 2, 3, 4, 5), "Bob", Content::attachment("Media/IMG-1.jpg")),
            Message::received(at(2020, 1, 2, 3, 4, 6), "Bob", Content::attachment("voice.opus")),
        ];
        let refs: Vec<&Message> = messages.iter().collect();
        let options = TranscriptOptions {
            rename_attachments: true,
            ..TranscriptOptions::default()
        };
        let (text, attachments) = render(&refs, &options, &mut AttachmentNamer::new(true));
        assert!(text.contains("Bob: 2020-01-02-00001.jpg <attached>\r\n"));
        assert!(text.contains("Bob: 2020-01-02-00002.opus <attached>\r\n"));
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].name, "Media/IMG-1.jpg");
        assert_eq!(attachments[0].output, "2020-01-02-00001.jpg");
    }

    #[test]
    fn output_parses_back() {
        let original = "[01.02.21, 10:00:00] Me: Morning\r\n\
                        01.02.21, 10:01:00 Alice: <attached: 00000001-PHOTO.jpg>\r\n\
                        01.02.21, 10:02:00 Alice changed the group name\r\n\
                        01.02.21, 10:03:00 Alice: two\nlines\r\n";
        let parsed = whatsapp::parse(original, Some("Me"), &DateRange::default()).unwrap();
        let refs: Vec<&Message> = parsed.iter().collect();
        let (text, _) = render(&refs, &TranscriptOptions::default(), &mut AttachmentNamer::new(false));
        let reparsed = whatsapp::parse(&text, Some("Me"), &DateRange::default()).unwrap();

        let key = |m: &Message| (m.timestamp(), m.kind(), m.content().clone());
        assert_eq!(
            parsed.iter().map(key).collect::<Vec<_>>(),
            reparsed.iter().map(key).collect::<Vec<_>>()
        );
    }

    #[test]
    fn writes_file_and_copies_attachments() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("_chat.txt"), "").unwrap();
        std::fs::write(input.path().join("doc.pdf"), b"%PDF").unwrap();

        let mut sources = Sources::new();
        let id = sources.push(Input::open(input.path()).unwrap());
        let mut store = MessageStore::new(SenderMap::new());
        store.add(
            [
                Message::sent(at(2020, 1, 1, 9, 0, 0), Content::text("see file")),
                Message::sent(at(2020, 1, 1, 9, 0, 1), Content::attachment("doc.pdf")),
            ],
            id,
        );

        let options = TranscriptOptions {
            attachments: AttachmentPolicy::Copy,
            ..TranscriptOptions::default()
        };
        let count = write(&store, &mut sources, out.path(), &options, &mut Silent).unwrap();
        assert_eq!(count, 2);

        let text = std::fs::read_to_string(out.path().join(FILE_NAME)).unwrap();
        assert!(text.ends_with("01.01.20, 09:00:01 Me: doc.pdf <attached>\r\n"));
        assert_eq!(std::fs::read(out.path().join("doc.pdf")).unwrap(), b"%PDF");
    }
}
