// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON settings file.
//!
//! Every field is optional. Command-line flags take precedence over the
//! values read here.
//!
//! ```json
//! {
//!   "me": "Jane",
//!   "title": "Family chat",
//!   "senders": { "+49 170": "Bob" },
//!   "from": "2020-01-01",
//!   "split": "month"
//! }
//! ```

use crate::renderer::html::Split;
use chrono::NaiveDate;
use serde::Deserialize;
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Error type for loading a settings file.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// The file could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        /// The settings file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid settings JSON.
    #[snafu(display("failed to parse {}: {source}", path.display()))]
    Parse {
        /// The settings file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Settings read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Sender id identifying "me".
    pub me: Option<String>,

    /// Document title.
    pub title: Option<String>,

    /// Raw sender substring to display name.
    pub senders: BTreeMap<String, String>,

    /// First day to include.
    pub from: Option<NaiveDate>,

    /// Last day to include.
    pub to: Option<NaiveDate>,

    /// Directory of emoji images.
    pub emoji_dir: Option<PathBuf>,

    /// Maximum width of embedded images.
    pub image_width: Option<u32>,

    /// Maximum height of embedded images.
    pub image_height: Option<u32>,

    /// Split HTML output by period.
    pub split: Option<Split>,
}

impl Settings {
    /// Parses settings from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has unknown fields.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses the settings file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        Self::parse(&json).context(ParseSnafu { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(Settings::parse("{}").unwrap(), Settings::default());
    }

    #[test]
    fn parses_all_fields() {
        let settings = Settings::parse(
            r#"{
                "me": "Jane",
                "title": "Trip",
                "senders": {"+49 170": "Bob"},
                "from": "2020-01-01",
                "to": "2020-12-31",
                "emoji_dir": "emoji",
                "image_width": 640,
                "image_height": 480,
                "split": "year"
            }"#,
        )
        .unwrap();

        assert_eq!(settings.me.as_deref(), Some("Jane"));
        assert_eq!(settings.title.as_deref(), Some("Trip"));
        assert_eq!(settings.senders.get("+49 170").map(String::as_str), Some("Bob"));
        assert_eq!(settings.from, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(settings.to, NaiveDate::from_ymd_opt(2020, 12, 31));
        assert_eq!(settings.emoji_dir, Some(PathBuf::from("emoji")));
        assert_eq!(settings.image_width, Some(640));
        assert_eq!(settings.image_height, Some(480));
        assert_eq!(settings.split, Some(Split::Year));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Settings::parse(r#"{"colour": "red"}"#).is_err());
    }

    #[test]
    fn rejects_bad_split() {
        assert!(Settings::parse(r#"{"split": "week"}"#).is_err());
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        match Settings::load(&path).unwrap_err() {
            ConfigError::Parse { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("Expected Parse, got {other:?}"),
        }
        assert!(matches!(
            Settings::load(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
