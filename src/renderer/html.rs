// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! HTML rendering of a message store.
//!
//! The output directory receives `index.html`, a `chatbook.css` stylesheet
//! and, when splitting by period, one `YYYY.html` or `YYYY-MM.html` document
//! per year or month. Headings carry `id` anchors (`2020`, `2020-06`,
//! `2020-06-15`) so the index can link to every day.
//!
//! Message text is escaped so that every non-ASCII character becomes a
//! numeric character reference; that is what the emoji substitution in
//! [`EmojiSet`] operates on.

use super::emoji::EmojiSet;
use super::{AttachmentNamer, AttachmentPolicy, CopySnafu, EmojiSnafu, WriteError, WriteSnafu, transfer};
use crate::image;
use crate::input::Sources;
use crate::message::{Content, DateRange, Message, MessageKind};
use crate::progress::Progress;
use crate::store::{MessageStore, MonthKey};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use snafu::prelude::*;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

/// Name of the main document.
pub const INDEX: &str = "index.html";

/// Name of the stylesheet written next to the documents.
pub const STYLESHEET: &str = "chatbook.css";

const STYLESHEET_TEMPLATE: &str = include_str!("../../assets/chatbook.css");

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[!-~&&[^<>"]]+"#).expect("valid URL pattern"));

/// How messages are distributed over documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    /// One document per month.
    Month,
    /// One document per year.
    Year,
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(format!("unknown split {other:?}, expected month or year")),
        }
    }
}

/// Configuration for HTML output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Document title, also shown as the first heading.
    pub title: Option<String>,

    /// Image copied next to the documents and used as page background.
    pub background: Option<PathBuf>,

    /// Split into documents per month or year; `None` writes one document.
    pub split: Option<Split>,

    /// Directory of `emoji_u*.png` or `emoji_u*.svg` images.
    pub emoji_dir: Option<PathBuf>,

    /// Largest width of inline images, in pixels.
    pub image_width: u32,

    /// Largest height of inline images, in pixels.
    pub image_height: u32,

    /// Whether attachments are copied or moved into the output directory.
    pub attachments: AttachmentPolicy,

    /// Name attachments `YYYY-MM-DD-NNNNN.ext` instead of their basename.
    pub rename_attachments: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            title: None,
            background: None,
            split: None,
            emoji_dir: None,
            image_width: 320,
            image_height: 240,
            attachments: AttachmentPolicy::Leave,
            rename_attachments: false,
        }
    }
}

/// Renders a [`MessageStore`] into an output directory.
pub struct HtmlWriter<'a> {
    store: &'a MessageStore,
    sources: &'a mut Sources,
    out_dir: &'a Path,
    options: &'a HtmlOptions,
    emoji: EmojiSet,
    namer: AttachmentNamer,
    show_senders: bool,
}

impl<'a> HtmlWriter<'a> {
    /// Prepares a writer; scans the emoji directory if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the emoji directory cannot be used.
    pub fn new(
        store: &'a MessageStore,
        sources: &'a mut Sources,
        out_dir: &'a Path,
        options: &'a HtmlOptions,
    ) -> Result<Self, WriteError> {
        let emoji = match &options.emoji_dir {
            Some(dir) => EmojiSet::scan(dir).context(EmojiSnafu)?,
            None => EmojiSet::none(),
        };
        Ok(Self {
            store,
            sources,
            out_dir,
            options,
            emoji,
            namer: AttachmentNamer::new(options.rename_attachments),
            // With a single other participant, names add nothing.
            show_senders: store.senders().len() > 1,
        })
    }

    /// Writes all documents, the stylesheet and the referenced assets.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be written or copied, or an
    /// attachment cannot be transferred.
    pub fn write(mut self, progress: &mut dyn Progress) -> Result<(), WriteError> {
        let store = self.store;
        let all = DateRange::unbounded();

        match self.options.split {
            None => {
                let mut body = self.title_heading();
                for year in store.years(&all) {
                    self.year_content(&mut body, year)?;
                }
                self.write_document(INDEX, &body, "Exporting chat", progress)?;
            }
            Some(split) => {
                let index = self.index(split);
                self.write_document(INDEX, &index, "Exporting index", progress)?;

                match split {
                    Split::Month => {
                        for month in store.months(None, &all) {
                            let mut body = String::new();
                            self.month_content(&mut body, month)?;
                            let what = format!("Exporting messages from {month}");
                            self.write_document(&format!("{month}.html"), &body, &what, progress)?;
                        }
                    }
                    Split::Year => {
                        for year in store.years(&all) {
                            let mut body = String::new();
                            self.year_content(&mut body, year)?;
                            let what = format!("Exporting messages from {year}");
                            self.write_document(&format!("{year}.html"), &body, &what, progress)?;
                        }
                    }
                }
            }
        }

        self.write_stylesheet(progress)?;
        self.copy_background(progress)?;

        let used = self.emoji.used();
        if used > 0 {
            progress.begin(&format!("Copying {used} used emoji files"));
            self.emoji.copy_used(self.out_dir).context(EmojiSnafu)?;
            progress.end();
        }
        Ok(())
    }

    fn write_document(
        &self,
        name: &str,
        body: &str,
        what: &str,
        progress: &mut dyn Progress,
    ) -> Result<(), WriteError> {
        let path = self.out_dir.join(name);
        progress.begin(&format!("{what} to \"{}\"", path.display()));
        std::fs::write(&path, document(self.options.title.as_deref(), body)).context(WriteSnafu { path: &path })?;
        progress.end();
        Ok(())
    }

    fn write_stylesheet(&self, progress: &mut dyn Progress) -> Result<(), WriteError> {
        let path = self.out_dir.join(STYLESHEET);
        progress.begin(&format!("Writing style sheet \"{}\"", path.display()));
        std::fs::write(&path, stylesheet(self.options)).context(WriteSnafu { path: &path })?;
        progress.end();
        Ok(())
    }

    fn copy_background(&self, progress: &mut dyn Progress) -> Result<(), WriteError> {
        let Some(background) = &self.options.background else {
            return Ok(());
        };
        let Some(name) = background.file_name() else {
            return Ok(());
        };
        progress.begin(&format!("Copying background image from \"{}\"", background.display()));
        std::fs::copy(background, self.out_dir.join(name)).context(CopySnafu { path: background })?;
        progress.end();
        Ok(())
    }

    fn title_heading(&self) -> String {
        self.options
            .title
            .as_deref()
            .map(|title| format!("<h1>{}</h1>\n", escape(title)))
            .unwrap_or_default()
    }

    /// Table of contents linking every day of the period documents.
    fn index(&self, split: Split) -> String {
        let all = DateRange::unbounded();
        let mut out = self.title_heading();

        for year in self.store.years(&all) {
            if split == Split::Year {
                writeln!(out, "<h1><a href=\"{year}.html\">{year}</a></h1>").unwrap();
            } else {
                writeln!(out, "<h1>{year}</h1>").unwrap();
            }
            writeln!(out, "<dl>").unwrap();

            for month in self.store.months(Some(year), &all) {
                let target = match split {
                    Split::Year => format!("{year}.html"),
                    Split::Month => format!("{month}.html"),
                };
                writeln!(out, "<dt><a href=\"{target}#{month}\">{}</a></dt>", month_title(month)).unwrap();
                let days: Vec<String> = self
                    .store
                    .days(Some(month), &all)
                    .into_iter()
                    .map(|day| format!("<a href=\"{target}#{day}\">{}</a>", day.format("%d")))
                    .collect();
                writeln!(out, "<dd>{}</dd>", days.join("\n")).unwrap();
            }

            writeln!(out, "</dl>").unwrap();
        }
        out
    }

    fn year_content(&mut self, out: &mut String, year: i32) -> Result<(), WriteError> {
        writeln!(out, "<h1 id=\"{year}\">{year}</h1>").unwrap();
        for month in self.store.months(Some(year), &DateRange::unbounded()) {
            self.month_content(out, month)?;
        }
        Ok(())
    }

    fn month_content(&mut self, out: &mut String, month: MonthKey) -> Result<(), WriteError> {
        let store = self.store;
        writeln!(out, "<h2 id=\"{month}\">{}</h2>", month_title(month)).unwrap();

        for day in store.days(Some(month), &DateRange::unbounded()) {
            writeln!(out, "<hr>").unwrap();
            writeln!(out, "<h3 id=\"{day}\">{}</h3>", day_title(day)).unwrap();
            writeln!(out, "<hr>").unwrap();
            for message in store.messages(Some(day), None) {
                out.push_str(&self.message(message)?);
            }
        }
        Ok(())
    }

    fn message(&mut self, message: &Message) -> Result<String, WriteError> {
        let mut out = String::new();

        if !message.is_user_message() {
            let body = match message.content() {
                Content::Text(text) => self.format_text(text),
                Content::Attachment(name) => escape(name),
                Content::Empty => String::new(),
            };
            writeln!(out, "<div class=\"message\"><div class=\"systemMessage\">{body}</div></div><p>").unwrap();
            return Ok(out);
        }

        let class = if message.kind() == MessageKind::Sent {
            "userMessage-Me"
        } else {
            "userMessage-Them"
        };
        writeln!(out, "<div class=\"message\">").unwrap();
        writeln!(out, "<div class=\"{class} userMessage\">").unwrap();

        if self.show_senders
            && let Some(sender) = message.sender().filter(|sender| !sender.is_empty())
        {
            write!(out, "<span class=\"senderName\">{}</span><br>", escape(sender)).unwrap();
        }

        match message.content() {
            Content::Text(text) => out.push_str(&self.format_text(text)),
            Content::Attachment(name) => out.push_str(&self.attachment(message, name)?),
            Content::Empty => {}
        }

        writeln!(out, "<div class=\"timestamp\">{}</div>", message.timestamp().format("%H:%M")).unwrap();
        writeln!(out, "</div>").unwrap();
        writeln!(out, "</div>").unwrap();
        writeln!(out, "<p>").unwrap();
        Ok(out)
    }

    /// Escapes `text`, links URLs and substitutes emoji.
    fn format_text(&mut self, text: &str) -> String {
        let mut html = String::new();
        let mut pos = 0;
        for url in URL.find_iter(text) {
            html.push_str(&escape(&text[pos..url.start()]));
            write!(html, "<a href=\"{}\">{}</a>", attribute(url.as_str()), escape(url.as_str())).unwrap();
            pos = url.end();
        }
        html.push_str(&escape(&text[pos..]));
        self.emoji.replace(&html)
    }

    fn attachment(&mut self, message: &Message, name: &str) -> Result<String, WriteError> {
        let (output, new) = self.namer.name(message.origin(), message.date(), name);
        let href = attribute(&output);
        let extension = Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let html = match extension.as_str() {
            "jpg" | "jpeg" | "png" | "thumb" => self.embed_image(message, name, &href),
            "mp4" => media("video", &href, &output),
            "opus" | "mp3" | "3gp" | "m4a" => media("audio", &href, &output),
            _ => {
                debug!(attachment = name, "no inline rendering for this file type");
                format!("<a href=\"{href}\">{}</a>\n", escape(&output))
            }
        };

        if new {
            transfer(
                self.sources,
                self.options.attachments,
                message,
                name,
                &self.out_dir.join(&output),
            )?;
        }
        Ok(html)
    }

    fn embed_image(&mut self, message: &Message, name: &str, href: &str) -> String {
        let info = message
            .origin()
            .and_then(|id| self.sources.get_mut(id))
            .and_then(|input| match input.open_attachment(name) {
                Ok(mut reader) => image::sniff(&mut reader),
                Err(err) => {
                    debug!(attachment = name, error = %err, "cannot open image");
                    None
                }
            });

        match info {
            Some(info) => {
                let (width, height) = fit(
                    info.width,
                    info.height,
                    self.options.image_width,
                    self.options.image_height,
                );
                format!(
                    "<a href=\"{href}\">\n<img class=\"inlineImage\" width=\"{width}\" height=\"{height}\" src=\"{href}\">\n</a>\n"
                )
            }
            None => {
                debug!(attachment = name, "image size unknown, embedding unscaled");
                format!("<img class=\"inlineImage\" src=\"{href}\">\n")
            }
        }
    }
}

fn document(title: Option<&str>, body: &str) -> String {
    let mut out = String::new();
    writeln!(out, "<!DOCTYPE html>").unwrap();
    writeln!(out, "<html>").unwrap();
    writeln!(out, "<head>").unwrap();
    writeln!(out, "<meta charset=\"utf-8\">").unwrap();
    if let Some(title) = title {
        writeln!(out, "<title>{}</title>", escape(title)).unwrap();
    }
    writeln!(out, "<link rel=\"stylesheet\" href=\"{STYLESHEET}\">").unwrap();
    writeln!(out, "</head>").unwrap();
    writeln!(out, "<body>").unwrap();
    out.push_str(body);
    writeln!(out, "</body>").unwrap();
    writeln!(out, "</html>").unwrap();
    out
}

fn stylesheet(options: &HtmlOptions) -> String {
    let background = options
        .background
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| format!("background-image: url(\"{}\");", name.to_string_lossy()))
        .unwrap_or_default();

    STYLESHEET_TEMPLATE
        .replace("{image_width}", &options.image_width.to_string())
        .replace("{image_height}", &options.image_height.to_string())
        .replace("{background}", &background)
}

fn media(tag: &str, href: &str, output: &str) -> String {
    format!(
        "<{tag} controls=\"\">\n<source src=\"{href}\">\n<a href=\"{href}\">{}</a>\n</{tag}>\n",
        escape(output)
    )
}

fn month_title(month: MonthKey) -> String {
    month.first_day().format("%B %Y").to_string()
}

fn day_title(day: NaiveDate) -> String {
    day.format("%B %-d, %Y").to_string()
}

/// Escapes markup characters and every non-ASCII character as numeric
/// character references; newlines become `<br>`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("<br>"),
            c if !c.is_ascii() || matches!(c, '<' | '>' | '&') => write!(out, "&#{};", u32::from(c)).unwrap(),
            c => out.push(c),
        }
    }
    out
}

/// Escapes a value for a double-quoted attribute.
fn attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Scales `width`×`height` down to fit the bounds, keeping the aspect ratio.
fn fit(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let (w, h) = (u64::from(width), u64::from(height));
    let (mw, mh) = (u64::from(max_width), u64::from(max_height));
    let (new_w, new_h) = if w * mh > h * mw {
        (mw, (h * mw).checked_div(w).unwrap_or(0))
    } else {
        ((w * mh).checked_div(h).unwrap_or(0), mh)
    };

    (
        u32::try_from(new_w).unwrap_or(max_width),
        u32::try_from(new_h).unwrap_or(max_height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Input;
    use crate::message::SourceId;
    use crate::progress::Silent;
    use crate::store::SenderMap;
    use chrono::NaiveDateTime;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    /// A store whose messages come from a directory input at `dir`.
    fn store_from(dir: &Path, messages: Vec<Message>) -> (MessageStore, Sources, SourceId) {
        std::fs::write(dir.join("_chat.txt"), "").unwrap();
        let mut sources = Sources::new();
        let id = sources.push(Input::open(dir).unwrap());
        let mut store = MessageStore::new(SenderMap::new());
        store.add(messages, id);
        (store, sources, id)
    }

    fn render(store: &MessageStore, sources: &mut Sources, out: &Path, options: &HtmlOptions) {
        HtmlWriter::new(store, sources, out, options)
            .unwrap()
            .write(&mut Silent)
            .unwrap();
    }

    #[test]
    fn escapes_markup_and_non_ascii() {
        assert_eq!(escape("a<b> & ä\nz"), "a&#60;b&#62; &#38; &#228;<br>z");
    }

    #[test]
    fn fits_images_into_bounds() {
        assert_eq!(fit(800, 600, 320, 240), (320, 240));
        assert_eq!(fit(1000, 500, 320, 240), (320, 160));
        assert_eq!(fit(300, 1200, 320, 240), (60, 240));
        assert_eq!(fit(100, 50, 320, 240), (100, 50));
    }

    #[test]
    fn parses_split_names() {
        assert_eq!("month".parse::<Split>(), Ok(Split::Month));
        assert_eq!("year".parse::<Split>(), Ok(Split::Year));
        assert!("week".parse::<Split>().is_err());
    }

    #[test]
    fn substitutes_stylesheet_placeholders() {
        let options = HtmlOptions {
            background: Some(PathBuf::from("/tmp/paper.jpg")),
            image_width: 400,
            ..HtmlOptions::default()
        };
        let css = stylesheet(&options);
        assert!(css.contains("max-width: 400px;"));
        assert!(css.contains("max-height: 240px;"));
        assert!(css.contains("background-image: url(\"paper.jpg\");"));
        assert!(!css.contains("{background}"));
    }

    #[test]
    fn writes_single_document_with_headings() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let messages = vec![
            Message::received(at(2020, 6, 15, 9, 5), "Alice", Content::text("See https://example.com/?a=1&b=2")),
            Message::sent(at(2020, 6, 15, 9, 6), Content::text("Thanks")),
            Message::system(at(2020, 6, 15, 9, 7), "Alice left"),
        ];
        let (store, mut sources, _) = store_from(input.path(), messages);
        let options = HtmlOptions {
            title: Some("Chat with Alice".into()),
            ..HtmlOptions::default()
        };
        render(&store, &mut sources, out.path(), &options);

        let html = std::fs::read_to_string(out.path().join(INDEX)).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Chat with Alice</title>"));
        assert!(html.contains("<h1 id=\"2020\">2020</h1>"));
        assert!(html.contains("<h2 id=\"2020-06\">June 2020</h2>"));
        assert!(html.contains("<h3 id=\"2020-06-15\">June 15, 2020</h3>"));
        assert!(html.contains("<a href=\"https://example.com/?a=1&amp;b=2\">https://example.com/?a=1&#38;b=2</a>"));
        assert!(html.contains("<div class=\"userMessage-Me userMessage\">"));
        assert!(html.contains("<div class=\"userMessage-Them userMessage\">"));
        assert!(html.contains("<div class=\"timestamp\">09:05</div>"));
        assert!(html.contains("<div class=\"systemMessage\">Alice left</div>"));
        // Only one other participant.
        assert!(!html.contains("senderName"));
        assert!(out.path().join(STYLESHEET).exists());
    }

    #[test]
    fn names_senders_in_group_chats() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let messages = vec![
            Message::received(at(2020, 1, 1, 10, 0), "Alice", Content::text("hi")),
            Message::received(at(2020, 1, 1, 10, 1), "Bob", Content::text("hey")),
        ];
        let (store, mut sources, _) = store_from(input.path(), messages);
        render(&store, &mut sources, out.path(), &HtmlOptions::default());

        let html = std::fs::read_to_string(out.path().join(INDEX)).unwrap();
        assert!(html.contains("<span class=\"senderName\">Alice</span><br>"));
        assert!(html.contains("<span class=\"senderName\">Bob</span><br>"));
    }

    #[test]
    fn embeds_scaled_image_and_copies_it() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("IMG-1.jpg"), png(800, 600)).unwrap();
        let messages = vec![Message::sent(at(2021, 3, 1, 12, 0), Content::attachment("IMG-1.jpg"))];
        let (store, mut sources, _) = store_from(input.path(), messages);
        let options = HtmlOptions {
            attachments: AttachmentPolicy::Copy,
            rename_attachments: true,
            ..HtmlOptions::default()
        };
        render(&store, &mut sources, out.path(), &options);

        let html = std::fs::read_to_string(out.path().join(INDEX)).unwrap();
        assert!(html.contains(
            "<img class=\"inlineImage\" width=\"320\" height=\"240\" src=\"2021-03-01-00001.jpg\">"
        ));
        assert!(out.path().join("2021-03-01-00001.jpg").exists());
        assert!(input.path().join("IMG-1.jpg").exists());
    }

    #[test]
    fn typed_attachments() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let messages = vec![
            Message::sent(at(2021, 3, 1, 12, 0), Content::attachment("clip.MP4")),
            Message::sent(at(2021, 3, 1, 12, 1), Content::attachment("voice.opus")),
            Message::sent(at(2021, 3, 1, 12, 2), Content::attachment("doc.pdf")),
            Message::sent(at(2021, 3, 1, 12, 3), Content::attachment("broken.png")),
        ];
        let (store, mut sources, _) = store_from(input.path(), messages);
        render(&store, &mut sources, out.path(), &HtmlOptions::default());

        let html = std::fs::read_to_string(out.path().join(INDEX)).unwrap();
        assert!(html.contains("<video controls=\"\">\n<source src=\"clip.MP4\">"));
        assert!(html.contains("<audio controls=\"\">\n<source src=\"voice.opus\">"));
        assert!(html.contains("<a href=\"doc.pdf\">doc.pdf</a>"));
        assert!(html.contains("<img class=\"inlineImage\" src=\"broken.png\">"));
    }

    #[test]
    fn monthly_split_writes_index_and_periods() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let messages = vec![
            Message::sent(at(2020, 1, 5, 8, 0), Content::text("jan")),
            Message::sent(at(2020, 2, 7, 8, 0), Content::text("feb")),
        ];
        let (store, mut sources, _) = store_from(input.path(), messages);
        let options = HtmlOptions {
            split: Some(Split::Month),
            ..HtmlOptions::default()
        };
        render(&store, &mut sources, out.path(), &options);

        let index = std::fs::read_to_string(out.path().join(INDEX)).unwrap();
        assert!(index.contains("<h1>2020</h1>"));
        assert!(index.contains("<dt><a href=\"2020-01.html#2020-01\">January 2020</a></dt>"));
        assert!(index.contains("<a href=\"2020-02.html#2020-02-07\">07</a>"));

        let february = std::fs::read_to_string(out.path().join("2020-02.html")).unwrap();
        assert!(february.contains("<h2 id=\"2020-02\">February 2020</h2>"));
        assert!(february.contains("feb"));
        assert!(!february.contains("jan"));
    }

    #[test]
    fn yearly_split_links_year_documents() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let messages = vec![Message::sent(at(2019, 12, 31, 23, 0), Content::text("bye"))];
        let (store, mut sources, _) = store_from(input.path(), messages);
        let options = HtmlOptions {
            split: Some(Split::Year),
            ..HtmlOptions::default()
        };
        render(&store, &mut sources, out.path(), &options);

        let index = std::fs::read_to_string(out.path().join(INDEX)).unwrap();
        assert!(index.contains("<h1><a href=\"2019.html\">2019</a></h1>"));
        assert!(index.contains("<a href=\"2019.html#2019-12-31\">31</a>"));
        assert!(out.path().join("2019.html").exists());
    }

    #[test]
    fn copies_used_emoji_only() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let emoji = tempfile::tempdir().unwrap();
        std::fs::write(emoji.path().join("emoji_u1f600.png"), png(1, 1)).unwrap();
        std::fs::write(emoji.path().join("emoji_u1f44d.png"), png(1, 1)).unwrap();

        let messages = vec![Message::sent(at(2020, 1, 1, 0, 0), Content::text("\u{1f600}"))];
        let (store, mut sources, _) = store_from(input.path(), messages);
        let options = HtmlOptions {
            emoji_dir: Some(emoji.path().to_path_buf()),
            ..HtmlOptions::default()
        };
        render(&store, &mut sources, out.path(), &options);

        let html = std::fs::read_to_string(out.path().join(INDEX)).unwrap();
        assert!(html.contains("<img class=\"standaloneEmoji\" src=\"emoji_u1f600.png\">"));
        assert!(out.path().join("emoji_u1f600.png").exists());
        assert!(!out.path().join("emoji_u1f44d.png").exists());
    }
}
