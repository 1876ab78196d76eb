// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Emoji substitution with image assets.
//!
//! Works on HTML in which every non-ASCII character is already a numeric
//! character reference (`&#128512;`). Runs of such references are matched
//! against an inventory of emoji images named `emoji_u<hex>[_<hex>...]` with a
//! `.png` or `.svg` extension, as shipped by the Noto emoji font.
//!
//! Within a run, the longest codepoint sequence with an image wins. A
//! codepoint without an image is kept as a character reference, except for
//! skin tone modifiers directly after an image, which are dropped.

use regex::Regex;
use snafu::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;
use walkdir::WalkDir;

const FILE_PREFIX: &str = "emoji_u";
const VARIATION_SELECTORS: RangeInclusive<u32> = 0xfe00..=0xfe0f;
const SKIN_TONES: RangeInclusive<u32> = 0x1f3fb..=0x1f3ff;

static REFERENCE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:&#[0-9]+;)+").expect("valid reference pattern"));

/// Error type for emoji directory failures.
#[derive(Debug, Snafu)]
pub enum EmojiError {
    /// The emoji directory could not be listed.
    #[snafu(display("failed to read emoji directory {}: {source}", path.display()))]
    Scan {
        /// The emoji directory.
        path: PathBuf,
        /// The underlying directory walk error.
        source: walkdir::Error,
    },

    /// An emoji file is neither PNG nor SVG.
    #[snafu(display("emoji file {} is neither PNG nor SVG", path.display()))]
    UnsupportedFormat {
        /// The offending file.
        path: PathBuf,
    },

    /// The emoji directory holds both PNG and SVG files.
    #[snafu(display("emoji directory {} holds both PNG and SVG files", path.display()))]
    MixedFormats {
        /// The emoji directory.
        path: PathBuf,
    },

    /// A used emoji file could not be copied.
    #[snafu(display("failed to copy emoji {}: {source}", path.display()))]
    CopyFile {
        /// The emoji file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// An inventory of emoji images and the subset used so far.
#[derive(Debug, Default)]
pub struct EmojiSet {
    dir: Option<PathBuf>,
    extension: Option<&'static str>,
    /// Codepoint sequence to file basename (without prefix and extension).
    files: HashMap<Vec<u32>, String>,
    longest: usize,
    used: BTreeSet<String>,
}

enum Unit {
    Text(String),
    Literal(u32),
    Image(String),
}

impl EmojiSet {
    /// An empty inventory; every codepoint stays a character reference.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Scans `dir` for `emoji_u*.png` or `emoji_u*.svg` files.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read, a file has another
    /// extension, or PNG and SVG files are mixed.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self, EmojiError> {
        let dir = dir.as_ref();
        let mut set = Self {
            dir: Some(dir.to_path_buf()),
            ..Self::default()
        };

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.context(ScanSnafu { path: dir })?;
            let file_name = entry.file_name().to_string_lossy();
            let Some(rest) = file_name.strip_prefix(FILE_PREFIX) else {
                continue;
            };

            let (base, extension) = match rest.rsplit_once('.') {
                Some((base, "png")) => (base, "png"),
                Some((base, "svg")) => (base, "svg"),
                _ => return UnsupportedFormatSnafu { path: entry.path() }.fail(),
            };
            ensure!(
                set.extension.is_none_or(|known| known == extension),
                MixedFormatsSnafu { path: dir }
            );
            set.extension = Some(extension);

            if !set.insert(base) {
                debug!(file = %entry.path().display(), "skipping emoji file with a non-hex name");
            }
        }

        debug!(dir = %dir.display(), count = set.files.len(), "scanned emoji images");
        Ok(set)
    }

    /// Adds the image `emoji_u<base>` to the inventory.
    fn insert(&mut self, base: &str) -> bool {
        let codepoints: Option<Vec<u32>> = base
            .split('_')
            .map(|hex| u32::from_str_radix(hex, 16).ok())
            .collect();
        let Some(codepoints) = codepoints.filter(|cps| !cps.is_empty()) else {
            return false;
        };
        self.longest = self.longest.max(codepoints.len());
        self.files.insert(codepoints, base.to_owned());
        true
    }

    /// Number of images in the inventory.
    #[must_use]
    pub fn available(&self) -> usize {
        self.files.len()
    }

    /// Number of distinct images referenced so far.
    #[must_use]
    pub fn used(&self) -> usize {
        self.used.len()
    }

    fn file_name(&self, base: &str) -> String {
        format!("{FILE_PREFIX}{base}.{}", self.extension.unwrap_or("png"))
    }

    /// Replaces emoji in escaped `html` with `<img>` references.
    ///
    /// Images get the class `standaloneEmoji` when `html` has no other
    /// visible text, `inlineEmoji` otherwise.
    pub fn replace(&mut self, html: &str) -> String {
        let mut units = Vec::new();
        let mut has_text = false;
        let mut last_was_literal = true;
        let mut pos = 0;

        for run in REFERENCE_RUN.find_iter(html) {
            let before = &html[pos..run.start()];
            if !before.is_empty() {
                has_text |= !before.trim().is_empty();
                units.push(Unit::Text(before.to_owned()));
                last_was_literal = true;
            }
            pos = run.end();

            let codepoints: Vec<u32> = run
                .as_str()
                .split(';')
                .filter_map(|reference| reference.strip_prefix("&#")?.parse().ok())
                .filter(|cp| !VARIATION_SELECTORS.contains(cp))
                .collect();
            self.replace_run(&codepoints, &mut units, &mut last_was_literal);
        }

        let rest = &html[pos..];
        has_text |= !rest.trim().is_empty();
        if !rest.is_empty() {
            units.push(Unit::Text(rest.to_owned()));
        }

        let class = if has_text {
            "inlineEmoji"
        } else {
            "standaloneEmoji"
        };
        let mut out = String::with_capacity(html.len());
        for unit in units {
            match unit {
                Unit::Text(text) => out.push_str(&text),
                Unit::Literal(cp) => write!(out, "&#{cp};").unwrap(),
                Unit::Image(base) => write!(out, "<img class=\"{class}\" src=\"{}\">", self.file_name(&base)).unwrap(),
            }
        }
        out
    }

    fn replace_run(&mut self, codepoints: &[u32], units: &mut Vec<Unit>, last_was_literal: &mut bool) {
        let mut i = 0;
        while i < codepoints.len() {
            let rest = &codepoints[i..];
            let matched = (1..=rest.len().min(self.longest))
                .rev()
                .find_map(|len| self.files.get(&rest[..len]).map(|base| (len, base.clone())));

            if let Some((len, base)) = matched {
                self.used.insert(base.clone());
                units.push(Unit::Image(base));
                *last_was_literal = false;
                i += len;
                continue;
            }

            let cp = rest[0];
            if SKIN_TONES.contains(&cp) {
                if *last_was_literal {
                    units.push(Unit::Literal(cp));
                }
                *last_was_literal = false;
            } else {
                units.push(Unit::Literal(cp));
                *last_was_literal = true;
            }
            i += 1;
        }
    }

    /// Copies every used image into `out_dir`; returns the number copied.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be copied.
    pub fn copy_used(&self, out_dir: &Path) -> Result<usize, EmojiError> {
        let Some(dir) = &self.dir else {
            return Ok(0);
        };
        for base in &self.used {
            let name = self.file_name(base);
            let source = dir.join(&name);
            std::fs::copy(&source, out_dir.join(&name)).context(CopyFileSnafu { path: &source })?;
        }
        Ok(self.used.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> EmojiSet {
        let mut set = EmojiSet {
            extension: Some("png"),
            ..EmojiSet::default()
        };
        for name in names {
            assert!(set.insert(name));
        }
        set
    }

    fn refs(codepoints: &[u32]) -> String {
        codepoints.iter().map(|cp| format!("&#{cp};")).collect()
    }

    #[test]
    fn prefers_longest_sequence() {
        let mut set = set(&["1f468_200d_1f469", "1f468"]);
        let out = set.replace(&refs(&[0x1f468, 0x200d, 0x1f469]));
        assert_eq!(out, "<img class=\"standaloneEmoji\" src=\"emoji_u1f468_200d_1f469.png\">");
        assert_eq!(set.used(), 1);
    }

    #[test]
    fn falls_back_to_shorter_sequence() {
        let mut set = set(&["1f468_200d_1f469", "1f468"]);
        let out = set.replace(&refs(&[0x1f468, 0x1f468]));
        assert_eq!(out.matches("emoji_u1f468.png").count(), 2);
    }

    #[test]
    fn drops_skin_tone_after_image() {
        let mut set = set(&["1f44d"]);
        let out = set.replace(&refs(&[0x1f44d, 0x1f3fc]));
        assert_eq!(out, "<img class=\"standaloneEmoji\" src=\"emoji_u1f44d.png\">");
    }

    #[test]
    fn keeps_skin_tone_after_literal() {
        let mut set = set(&["1f44d"]);
        let out = set.replace(&refs(&[0x1f600, 0x1f3fc]));
        assert_eq!(out, "&#128512;&#127996;");
    }

    #[test]
    fn strips_variation_selectors() {
        let mut set = set(&["2764"]);
        let out = set.replace(&refs(&[0x2764, 0xfe0f]));
        assert_eq!(out, "<img class=\"standaloneEmoji\" src=\"emoji_u2764.png\">");
    }

    #[test]
    fn text_makes_emoji_inline() {
        let mut set = set(&["1f600"]);
        let out = set.replace("Hi &#128512; there");
        assert_eq!(out, "Hi <img class=\"inlineEmoji\" src=\"emoji_u1f600.png\"> there");

        let trailing = set.replace("&#128512; ok");
        assert!(trailing.contains("inlineEmoji"));
    }

    #[test]
    fn zero_padded_names_match() {
        let mut set = set(&["00a9"]);
        let out = set.replace("&#169;");
        assert!(out.contains("src=\"emoji_u00a9.png\""));
    }

    #[test]
    fn empty_inventory_keeps_literals() {
        let mut set = EmojiSet::none();
        assert_eq!(set.replace("a &#228; b"), "a &#228; b");
        assert_eq!(set.used(), 0);
    }

    #[test]
    fn scans_and_copies_used_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("emoji_u1f600.svg"), "<svg/>").unwrap();
        std::fs::write(dir.path().join("emoji_u1f44d.svg"), "<svg/>").unwrap();
        std::fs::write(dir.path().join("README"), "ignored").unwrap();

        let mut set = EmojiSet::scan(dir.path()).unwrap();
        assert_eq!(set.available(), 2);
        assert!(set.replace("&#128512;").contains("emoji_u1f600.svg"));
        assert_eq!(set.copy_used(out.path()).unwrap(), 1);
        assert!(out.path().join("emoji_u1f600.svg").exists());
        assert!(!out.path().join("emoji_u1f44d.svg").exists());
    }

    #[test]
    fn rejects_mixed_formats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("emoji_u1f600.svg"), "").unwrap();
        std::fs::write(dir.path().join("emoji_u1f44d.png"), "").unwrap();
        let err = EmojiSet::scan(dir.path()).unwrap_err();
        assert!(matches!(err, EmojiError::MixedFormats { .. }));
    }

    #[test]
    fn rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("emoji_u1f600.gif"), "").unwrap();
        let err = EmojiSet::scan(dir.path()).unwrap_err();
        assert!(matches!(err, EmojiError::UnsupportedFormat { .. }));
    }
}
