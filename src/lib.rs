// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert exported messenger chat transcripts to browsable HTML.
//!
//! This crate reads chat exports from WhatsApp, Threema and Elcomsoft
//! Explorer for WhatsApp, merges them into one chronological history, and
//! writes that history either as a set of HTML documents or back as a
//! WhatsApp `_chat.txt`.
//!
//! # Overview
//!
//! 1. [`input::Input`] opens a transcript file, an export directory or a
//!    `.zip` archive
//! 2. [`parser`] detects the transcript format and produces
//!    [`message::Message`] values
//! 3. [`store::MessageStore`] deduplicates and indexes them by date
//! 4. [`renderer`] writes the store out
//!
//! # Example
//!
//! ```no_run
//! use chatbook::input::{Input, Sources};
//! use chatbook::parser::{self, ParseOptions};
//! use chatbook::progress::Console;
//! use chatbook::renderer::html::{HtmlOptions, HtmlWriter};
//! use chatbook::store::{MessageStore, SenderMap};
//! use std::path::Path;
//!
//! let mut input = Input::open("WhatsApp Chat.zip").unwrap();
//! let options = ParseOptions {
//!     me: Some("Jane".into()),
//!     ..Default::default()
//! };
//! let messages = parser::parse(&mut input, &options).unwrap();
//!
//! let mut sources = Sources::new();
//! let origin = sources.push(input);
//! let mut store = MessageStore::new(SenderMap::new());
//! store.add(messages, origin);
//!
//! let html = HtmlOptions::default();
//! let writer = HtmlWriter::new(&store, &mut sources, Path::new("out"), &html).unwrap();
//! writer.write(&mut Console).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`input`]: transcript containers and attachment access
//! - [`parser`]: format detection and the per-format parsers
//! - [`message`]: the canonical message model
//! - [`store`]: deduplicating, date-indexed message storage
//! - [`renderer`]: HTML and transcript output
//! - [`image`]: PNG and JPEG dimension sniffing
//! - [`config`]: JSON settings file
//! - [`progress`]: progress notifications

#![deny(missing_docs)]

pub mod config;
pub mod image;
pub mod input;
pub mod message;
pub mod parser;
pub mod progress;
pub mod renderer;
pub mod store;
