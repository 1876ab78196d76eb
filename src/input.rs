// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Access to exported chats stored in a directory or a zip archive.
//!
//! An export consists of exactly one transcript (`.txt` or `.xlsx`) and the
//! attachment files it references, which live next to the transcript. An
//! [`Input`] hides whether those files sit in a plain directory or inside a
//! zip archive.
//!
//! Opened inputs are owned by a [`Sources`] arena; messages refer back to
//! their input through a [`SourceId`].

use crate::message::SourceId;
use snafu::prelude::*;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::result::ZipError;

/// Error type for reading inputs.
#[derive(Debug, Snafu)]
pub enum InputError {
    /// The path is neither a directory, a file, nor a zip archive.
    #[snafu(display("unknown input {}", path.display()))]
    UnknownInput {
        /// The offending path.
        path: PathBuf,
    },

    /// The input does not hold exactly one transcript file.
    #[snafu(display(
        "expected exactly one .txt or .xlsx transcript in {}, found {found}",
        path.display()
    ))]
    UnrecognizedFormat {
        /// The directory or archive that was searched.
        path: PathBuf,
        /// Number of candidate transcript files.
        found: usize,
    },

    /// Reading from or writing to the file system failed.
    #[snafu(display("failed to access {}: {source}", path.display()))]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The zip archive could not be read.
    #[snafu(display("failed to read archive {}: {source}", path.display()))]
    Archive {
        /// The archive path.
        path: PathBuf,
        /// The underlying zip error.
        source: ZipError,
    },

    /// An attachment is missing from a zip archive.
    #[snafu(display("attachment {name} not found in {}: {source}", path.display()))]
    MissingAttachment {
        /// The archive path.
        path: PathBuf,
        /// The attachment name as referenced by the transcript.
        name: String,
        /// The underlying zip error.
        source: ZipError,
    },

    /// A text transcript is not valid UTF-8.
    #[snafu(display("transcript in {} is not valid UTF-8: {source}", path.display()))]
    Encoding {
        /// The input path.
        path: PathBuf,
        /// The underlying decoding error.
        source: std::string::FromUtf8Error,
    },

    /// The input cannot perform the requested operation.
    #[snafu(display("cannot {operation} attachments out of {}", path.display()))]
    UnsupportedOperation {
        /// The refused operation, e.g. `move`.
        operation: &'static str,
        /// The input path.
        path: PathBuf,
    },
}

/// The kind of transcript held by an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A plain-text transcript.
    Text,
    /// An `.xlsx` workbook.
    Spreadsheet,
}

impl InputKind {
    fn from_file_name(name: &str) -> Self {
        if has_extension(name, "xlsx") {
            Self::Spreadsheet
        } else {
            Self::Text
        }
    }
}

/// The raw transcript read from an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Decoded text transcript.
    Text(String),
    /// Undecoded workbook bytes.
    Spreadsheet(Vec<u8>),
}

/// A readable, seekable attachment stream.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

enum Backend {
    Directory {
        dir: PathBuf,
        transcript: PathBuf,
    },
    Archive {
        archive: ZipArchive<File>,
        transcript: String,
        base: String,
    },
}

/// An opened chat export.
pub struct Input {
    path: PathBuf,
    kind: InputKind,
    backend: Backend,
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Input")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Input {
    /// Opens a directory, a transcript file, or a `.zip` archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist, cannot be read, or does
    /// not contain exactly one transcript.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let name = path.to_string_lossy();

        if has_extension(&name, "zip") && path.is_file() {
            Self::open_archive(path)
        } else if path.is_dir() {
            Self::open_directory(path)
        } else if path.is_file() {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            Ok(Self {
                path: path.to_path_buf(),
                kind: InputKind::from_file_name(&name),
                backend: Backend::Directory {
                    dir,
                    transcript: path.to_path_buf(),
                },
            })
        } else {
            UnknownInputSnafu { path }.fail()
        }
    }

    fn open_directory(dir: &Path) -> Result<Self, InputError> {
        let candidates: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| is_transcript_name(&p.to_string_lossy()))
            .collect();

        let [transcript] = candidates.as_slice() else {
            return UnrecognizedFormatSnafu {
                path: dir,
                found: candidates.len(),
            }
            .fail();
        };

        Ok(Self {
            path: dir.to_path_buf(),
            kind: InputKind::from_file_name(&transcript.to_string_lossy()),
            backend: Backend::Directory {
                dir: dir.to_path_buf(),
                transcript: transcript.clone(),
            },
        })
    }

    fn open_archive(path: &Path) -> Result<Self, InputError> {
        let file = File::open(path).context(IoSnafu { path })?;
        let archive = ZipArchive::new(file).context(ArchiveSnafu { path })?;

        let candidates: Vec<String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/') && !name.starts_with("__MACOSX/"))
            .filter(|name| is_transcript_name(name))
            .map(str::to_owned)
            .collect();

        let [transcript] = candidates.as_slice() else {
            return UnrecognizedFormatSnafu {
                path,
                found: candidates.len(),
            }
            .fail();
        };

        let base = transcript
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            kind: InputKind::from_file_name(transcript),
            backend: Backend::Archive {
                transcript: transcript.clone(),
                base,
                archive,
            },
        })
    }

    /// The path this input was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The kind of transcript in this input.
    #[must_use]
    pub const fn kind(&self) -> InputKind {
        self.kind
    }

    /// Reads the complete transcript.
    ///
    /// # Errors
    ///
    /// Returns an error if the transcript cannot be read or a text
    /// transcript is not valid UTF-8.
    pub fn read_all(&mut self) -> Result<Payload, InputError> {
        let data = match &mut self.backend {
            Backend::Directory { transcript, .. } => {
                fs::read(&*transcript).context(IoSnafu { path: &*transcript })?
            }
            Backend::Archive {
                archive,
                transcript,
                ..
            } => {
                let mut entry = archive
                    .by_name(transcript)
                    .context(ArchiveSnafu { path: &self.path })?;
                let mut data = Vec::new();
                entry
                    .read_to_end(&mut data)
                    .context(IoSnafu { path: &self.path })?;
                data
            }
        };

        match self.kind {
            InputKind::Spreadsheet => Ok(Payload::Spreadsheet(data)),
            InputKind::Text => String::from_utf8(data)
                .map(Payload::Text)
                .context(EncodingSnafu { path: &self.path }),
        }
    }

    /// Opens an attachment for reading.
    ///
    /// Archive entries are buffered in memory so that the stream can seek.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment does not exist or cannot be read.
    pub fn open_attachment(&mut self, name: &str) -> Result<Box<dyn ReadSeek>, InputError> {
        match &mut self.backend {
            Backend::Directory { dir, .. } => {
                let path = dir.join(name);
                let file = File::open(&path).context(IoSnafu { path: &path })?;
                Ok(Box::new(file))
            }
            Backend::Archive { archive, base, .. } => {
                let entry_name = archive_path(base, name);
                let mut entry =
                    archive
                        .by_name(&entry_name)
                        .context(MissingAttachmentSnafu {
                            path: &self.path,
                            name,
                        })?;
                let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
                entry
                    .read_to_end(&mut data)
                    .context(IoSnafu { path: &self.path })?;
                Ok(Box::new(Cursor::new(data)))
            }
        }
    }

    /// Copies an attachment to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment cannot be read or `dest` cannot be
    /// written.
    pub fn copy_attachment(&mut self, name: &str, dest: &Path) -> Result<(), InputError> {
        match &mut self.backend {
            Backend::Directory { dir, .. } => {
                let path = dir.join(name);
                fs::copy(&path, dest).context(IoSnafu { path: &path })?;
            }
            Backend::Archive { archive, base, .. } => {
                let entry_name = archive_path(base, name);
                let mut entry =
                    archive
                        .by_name(&entry_name)
                        .context(MissingAttachmentSnafu {
                            path: &self.path,
                            name,
                        })?;
                let mut out = File::create(dest).context(IoSnafu { path: dest })?;
                io::copy(&mut entry, &mut out).context(IoSnafu { path: dest })?;
            }
        }
        Ok(())
    }

    /// Moves an attachment to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnsupportedOperation`] for zip archives, or an
    /// I/O error if the file cannot be moved.
    pub fn move_attachment(&mut self, name: &str, dest: &Path) -> Result<(), InputError> {
        match &self.backend {
            Backend::Directory { dir, .. } => {
                let path = dir.join(name);
                if fs::rename(&path, dest).is_err() {
                    // Renaming fails across file systems; fall back to copying.
                    fs::copy(&path, dest).context(IoSnafu { path: &path })?;
                    fs::remove_file(&path).context(IoSnafu { path: &path })?;
                }
                Ok(())
            }
            Backend::Archive { .. } => UnsupportedOperationSnafu {
                operation: "move",
                path: &self.path,
            }
            .fail(),
        }
    }
}

/// Owner of all opened inputs of a run.
///
/// Inputs are released together when the arena is dropped, after all
/// attachments have been extracted.
#[derive(Debug, Default)]
pub struct Sources {
    inputs: Vec<Input>,
}

impl Sources {
    /// Creates an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self { inputs: Vec::new() }
    }

    /// Adds an input and returns its handle.
    pub fn push(&mut self, input: Input) -> SourceId {
        self.inputs.push(input);
        SourceId(self.inputs.len() - 1)
    }

    /// Returns the input behind a handle.
    #[must_use]
    pub fn get(&self, id: SourceId) -> Option<&Input> {
        self.inputs.get(id.0)
    }

    /// Returns the input behind a handle for reading attachments.
    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut Input> {
        self.inputs.get_mut(id.0)
    }

    /// Number of inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Returns `true` if no input was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

fn archive_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else {
        format!("{base}/{name}")
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn is_transcript_name(name: &str) -> bool {
    has_extension(name, "txt") || has_extension(name, "xlsx")
}
