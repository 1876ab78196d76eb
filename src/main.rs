// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for chatbook.
//!
//! This binary provides the `chatbook` command for converting exported chat
//! transcripts into HTML documents or a merged WhatsApp `_chat.txt`.

use chatbook::config::{ConfigError, Settings};
use chatbook::input::{Input, InputError, Sources};
use chatbook::message::DateRange;
use chatbook::parser::spreadsheet::ChatNames;
use chatbook::parser::{self, Format, ParseError, ParseOptions};
use chatbook::progress::{Console, Progress, Silent};
use chatbook::renderer::html::{self, HtmlOptions, HtmlWriter, Split};
use chatbook::renderer::transcript::{self, TranscriptOptions};
use chatbook::renderer::{AttachmentPolicy, WriteError};
use chatbook::store::{MessageStore, SenderMap};
use chrono::NaiveDate;
use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// What to write into the output directory.
#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    /// HTML documents.
    Html,
    /// A WhatsApp `_chat.txt`.
    Chat,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: Option<PathBuf>,
    format: OutputFormat,
    me: Option<String>,
    map: Vec<(String, String)>,
    config: Option<PathBuf>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    chat: Option<String>,
    list_chats: bool,
    json: bool,
    title: Option<String>,
    background: Option<PathBuf>,
    split: Option<Split>,
    emoji_dir: Option<PathBuf>,
    image_width: Option<u32>,
    image_height: Option<u32>,
    attachments: AttachmentPolicy,
    rename_attachments: bool,
    force: bool,
    quiet: bool,
    verbose: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("missing required option: --output"))]
    MissingOutput,

    #[snafu(display("{source}"))]
    LoadConfig { source: ConfigError },

    #[snafu(display("failed to open {}: {source}", path.display()))]
    OpenInput { path: PathBuf, source: InputError },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseInput { path: PathBuf, source: ParseError },

    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display(
        "{} is not empty and holds no previous output, use --force to write anyway",
        path.display()
    ))]
    OutputNotEmpty { path: PathBuf },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteOutput { path: PathBuf, source: WriteError },

    #[snafu(display("failed to serialize chat list: {source}"))]
    SerializeChats { source: serde_json::Error },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert exported WhatsApp and Threema chats to HTML

Usage: {name} [OPTIONS] -o <OUTPUT> <INPUT>...

Arguments:
  <INPUT>...  Transcript files, export directories or .zip archives

Options:
  -o, --output <OUTPUT>     Output directory
      --format <FORMAT>     Output format: html or chat (default: html)
      --me <ID>             Sender id of the exporting user
      --map <ID=NAME>       Show senders containing ID as NAME (repeatable)
      --config <FILE>       Read settings from a JSON file
      --from <DATE>         Skip messages before DATE (YYYY-MM-DD)
      --to <DATE>           Skip messages after DATE (YYYY-MM-DD)

Spreadsheet inputs:
      --chat <NAME>         Convert the chat whose name contains NAME
      --list-chats          Print chats and participants, then exit
      --json                Print --list-chats output as JSON

HTML output:
      --title <TEXT>        Document title
      --background <FILE>   Page background image
      --split <PERIOD>      One document per month or year
      --emoji-dir <DIR>     Replace emoji with images from DIR
      --image-width <N>     Largest inline image width (default: 320)
      --image-height <N>    Largest inline image height (default: 240)

Attachments:
      --copy-attachments    Copy attachments into the output directory
      --move-attachments    Move attachments into the output directory
      --rename-attachments  Name attachments by date and sequence number

Other options:
  -f, --force               Write into a non-empty output directory
  -q, --quiet               Suppress progress messages
  -v, --verbose             Log diagnostics (overridden by RUST_LOG)
  -h, --help                Print help
  -V, --version             Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

#[allow(clippy::too_many_lines)]
fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut cli = Cli {
        input: Vec::new(),
        output: None,
        format: OutputFormat::Html,
        me: None,
        map: Vec::new(),
        config: None,
        from: None,
        to: None,
        chat: None,
        list_chats: false,
        json: false,
        title: None,
        background: None,
        split: None,
        emoji_dir: None,
        image_width: None,
        image_height: None,
        attachments: AttachmentPolicy::Leave,
        rename_attachments: false,
        force: false,
        quiet: false,
        verbose: false,
    };

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => cli.output = Some(parser.value()?.parse()?),
            Long("format") => {
                cli.format = match parser.value()?.string()?.as_str() {
                    "html" => OutputFormat::Html,
                    "chat" => OutputFormat::Chat,
                    _ => return Err("format must be html or chat".into()),
                };
            }
            Long("me") => cli.me = Some(parser.value()?.string()?),
            Long("map") => {
                let val = parser.value()?.string()?;
                let (id, name) = val.split_once('=').ok_or("map must be ID=NAME")?;
                cli.map.push((id.to_owned(), name.to_owned()));
            }
            Long("config") => cli.config = Some(parser.value()?.parse()?),
            Long("from") => cli.from = Some(parser.value()?.parse()?),
            Long("to") => cli.to = Some(parser.value()?.parse()?),
            Long("chat") => cli.chat = Some(parser.value()?.string()?),
            Long("list-chats") => cli.list_chats = true,
            Long("json") => cli.json = true,
            Long("title") => cli.title = Some(parser.value()?.string()?),
            Long("background") => cli.background = Some(parser.value()?.parse()?),
            Long("split") => cli.split = Some(parser.value()?.parse()?),
            Long("emoji-dir") => cli.emoji_dir = Some(parser.value()?.parse()?),
            Long("image-width") => cli.image_width = Some(parser.value()?.parse()?),
            Long("image-height") => cli.image_height = Some(parser.value()?.parse()?),
            // Attachment policy - last one wins
            Long("copy-attachments") => cli.attachments = AttachmentPolicy::Copy,
            Long("move-attachments") => cli.attachments = AttachmentPolicy::Move,
            Long("rename-attachments") => cli.rename_attachments = true,
            Short('f') | Long("force") => cli.force = true,
            Short('q') | Long("quiet") => cli.quiet = true,
            Short('v') | Long("verbose") => cli.verbose = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => cli.input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(cli)
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    // RUST_LOG takes precedence over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    let settings = match &cli.config {
        Some(path) => Settings::load(path).context(LoadConfigSnafu)?,
        None => Settings::default(),
    };

    if cli.list_chats {
        return list_chats(&cli);
    }

    let out_dir = cli.output.as_deref().context(MissingOutputSnafu)?;
    prepare_output_dir(out_dir, cli.force)?;

    let mut progress: Box<dyn Progress> = if cli.quiet {
        Box::new(Silent)
    } else {
        Box::new(Console)
    };

    let options = ParseOptions {
        me: cli.me.clone().or_else(|| settings.me.clone()),
        range: DateRange::new(cli.from.or(settings.from), cli.to.or(settings.to)),
        chat: cli.chat.clone(),
    };

    // File mappings first, so --map entries only apply where the file has none
    let sender_map: SenderMap = settings
        .senders
        .iter()
        .chain(cli.map.iter().map(|(id, name)| (id, name)))
        .map(|(id, name)| (id.as_str(), name.as_str()))
        .collect();

    let mut sources = Sources::new();
    let mut store = MessageStore::new(sender_map);
    for path in &cli.input {
        let mut input = Input::open(path).context(OpenInputSnafu { path })?;
        progress.begin(&format!("Reading {}", path.display()));
        let messages = parser::parse(&mut input, &options).context(ParseInputSnafu { path })?;
        let parsed = messages.len();
        let origin = sources.push(input);
        let added = store.add(messages, origin);
        progress.end();
        debug!(path = %path.display(), parsed, added, "merged input");
    }

    if store.is_empty() {
        warn!("no messages to write");
    }

    match cli.format {
        OutputFormat::Html => {
            let defaults = HtmlOptions::default();
            let html = HtmlOptions {
                title: cli.title.clone().or_else(|| settings.title.clone()),
                background: cli.background.clone(),
                split: cli.split.or(settings.split),
                emoji_dir: cli.emoji_dir.clone().or_else(|| settings.emoji_dir.clone()),
                image_width: cli
                    .image_width
                    .or(settings.image_width)
                    .unwrap_or(defaults.image_width),
                image_height: cli
                    .image_height
                    .or(settings.image_height)
                    .unwrap_or(defaults.image_height),
                attachments: cli.attachments,
                rename_attachments: cli.rename_attachments,
            };
            HtmlWriter::new(&store, &mut sources, out_dir, &html)
                .and_then(|writer| writer.write(progress.as_mut()))
                .context(WriteOutputSnafu { path: out_dir })?;
        }
        OutputFormat::Chat => {
            let options = TranscriptOptions {
                me: options.me.unwrap_or_else(|| TranscriptOptions::default().me),
                attachments: cli.attachments,
                rename_attachments: cli.rename_attachments,
            };
            transcript::write(&store, &mut sources, out_dir, &options, progress.as_mut())
                .context(WriteOutputSnafu { path: out_dir })?;
        }
    }

    Ok(())
}

/// Prints the chats of all spreadsheet inputs with their participants.
fn list_chats(cli: &Cli) -> Result<(), Error> {
    let mut chats = ChatNames::new();
    for path in &cli.input {
        let mut input = Input::open(path).context(OpenInputSnafu { path })?;
        let transcript = parser::open(&mut input).context(ParseInputSnafu { path })?;
        if transcript.format() != Format::Spreadsheet {
            warn!(path = %path.display(), format = %transcript.format(), "input has no chat list");
            continue;
        }
        for (chat, participants) in transcript.chat_names().context(ParseInputSnafu { path })? {
            chats.entry(chat).or_default().extend(participants);
        }
    }

    if let Some(fragment) = &cli.chat {
        chats.retain(|chat, _| chat.contains(fragment.as_str()));
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&chats).context(SerializeChatsSnafu)?;
        println!("{json}");
    } else {
        for (chat, participants) in &chats {
            println!("{chat}");
            for participant in participants {
                println!("  {participant}");
            }
        }
    }
    Ok(())
}

/// Creates the output directory, or checks that an existing one is empty or
/// holds a previous run's output.
fn prepare_output_dir(dir: &Path, force: bool) -> Result<(), Error> {
    if !dir.exists() {
        return std::fs::create_dir_all(dir).context(CreateOutputDirSnafu { path: dir });
    }

    let empty = std::fs::read_dir(dir)
        .context(CreateOutputDirSnafu { path: dir })?
        .next()
        .is_none();
    let previous = dir.join(html::INDEX).exists() || dir.join(transcript::FILE_NAME).exists();
    ensure!(empty || previous || force, OutputNotEmptySnafu { path: dir });
    Ok(())
}
