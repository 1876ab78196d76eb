// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Time-indexed, deduplicating storage for parsed messages.
//!
//! Messages are grouped into buckets by day and second. Within a bucket the
//! insertion order is kept, and a message whose body equals one already in
//! the bucket is dropped, so overlapping exports of the same chat can be
//! merged without repeating history.
//!
//! # Example
//!
//! ```
//! use chatbook::store::SenderMap;
//!
//! let mut senders = SenderMap::new();
//! senders.insert("+49 170", "Bob");
//!
//! assert_eq!(senders.resolve("+49 170 1234567"), "Bob");
//! assert_eq!(senders.resolve("Carol"), "Carol");
//! ```

use crate::message::{DateRange, Message, MessageKind, SourceId};
use chrono::{Datelike, Months, NaiveDate, NaiveTime};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// A calendar month, ordered chronologically and displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    /// The year.
    pub year: i32,
    /// The month, 1-12.
    pub month: u32,
}

impl MonthKey {
    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Maps raw sender ids to display names.
///
/// A raw sender is renamed if it contains one of the configured keys; keys
/// are tried in insertion order. Resolved names are cached per raw sender.
#[derive(Debug, Clone, Default)]
pub struct SenderMap {
    rules: Vec<(String, String)>,
    resolved: HashMap<String, String>,
}

impl SenderMap {
    /// Creates an empty map that keeps every sender as-is.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule: senders containing `key` are shown as `name`.
    pub fn insert(&mut self, key: impl Into<String>, name: impl Into<String>) {
        self.rules.push((key.into(), name.into()));
        self.resolved.clear();
    }

    /// Returns the display name for a raw sender id.
    pub fn resolve(&mut self, raw: &str) -> String {
        if let Some(name) = self.resolved.get(raw) {
            return name.clone();
        }

        let name = self
            .rules
            .iter()
            .find(|(key, _)| raw.contains(key.as_str()))
            .map_or_else(|| raw.to_owned(), |(_, name)| name.clone());

        self.resolved.insert(raw.to_owned(), name.clone());
        name
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SenderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, name) in iter {
            map.insert(key, name);
        }
        map
    }
}

type DayBuckets = BTreeMap<NaiveTime, Vec<Message>>;

/// All messages of a run, indexed by year, month, day and time of day.
#[derive(Debug, Default)]
pub struct MessageStore {
    days: BTreeMap<NaiveDate, DayBuckets>,
    years: BTreeSet<i32>,
    months: BTreeMap<i32, BTreeSet<MonthKey>>,
    days_by_month: BTreeMap<MonthKey, BTreeSet<NaiveDate>>,
    senders: BTreeSet<String>,
    sender_map: SenderMap,
    count: usize,
}

impl MessageStore {
    /// Creates an empty store that renames senders with `sender_map`.
    #[must_use]
    pub fn new(sender_map: SenderMap) -> Self {
        Self {
            sender_map,
            ..Self::default()
        }
    }

    /// Adds parsed messages read from `origin`.
    ///
    /// Received messages get their sender replaced by its display name.
    /// A message is dropped if its bucket (same second) already holds a
    /// message with the same text and attachment. Returns the number of
    /// messages actually added.
    pub fn add(&mut self, messages: impl IntoIterator<Item = Message>, origin: SourceId) -> usize {
        let mut added = 0;
        for mut message in messages {
            let timestamp = message.timestamp();
            let date = timestamp.date();
            let month = MonthKey::of(date);

            self.years.insert(month.year);
            self.months.entry(month.year).or_default().insert(month);
            self.days_by_month.entry(month).or_default().insert(date);

            if message.kind() == MessageKind::Received {
                let name = self.sender_map.resolve(message.sender().unwrap_or_default());
                if !name.is_empty() {
                    self.senders.insert(name.clone());
                }
                message.set_sender(name);
            }

            let bucket = self
                .days
                .entry(date)
                .or_default()
                .entry(timestamp.time())
                .or_default();

            if bucket.iter().any(|m| m.content() == message.content()) {
                tracing::trace!(%timestamp, "dropping duplicate message");
                continue;
            }

            message.set_origin(origin);
            bucket.push(message);
            added += 1;
        }
        self.count += added;
        added
    }

    /// Total number of stored messages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no message was stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Years with messages, optionally limited to years overlapping `range`.
    #[must_use]
    pub fn years(&self, range: &DateRange) -> Vec<i32> {
        self.years
            .iter()
            .copied()
            .filter(|&year| {
                match (
                    NaiveDate::from_ymd_opt(year, 1, 1),
                    NaiveDate::from_ymd_opt(year, 12, 31),
                ) {
                    (Some(first), Some(last)) => range.overlaps(first, last),
                    _ => false,
                }
            })
            .collect()
    }

    /// Months with messages, in one year or in all years overlapping `range`.
    #[must_use]
    pub fn months(&self, year: Option<i32>, range: &DateRange) -> Vec<MonthKey> {
        let years = year.map_or_else(|| self.years(range), |year| vec![year]);
        years
            .iter()
            .filter_map(|year| self.months.get(year))
            .flatten()
            .copied()
            .filter(|month| range.overlaps(month.first_day(), month.last_day()))
            .collect()
    }

    /// Days with messages, in one month or in all months overlapping `range`.
    #[must_use]
    pub fn days(&self, month: Option<MonthKey>, range: &DateRange) -> Vec<NaiveDate> {
        let months = month.map_or_else(|| self.months(None, range), |month| vec![month]);
        months
            .iter()
            .filter_map(|month| self.days_by_month.get(month))
            .flatten()
            .copied()
            .filter(|&day| range.contains(day))
            .collect()
    }

    /// Times of day with messages on `day`.
    #[must_use]
    pub fn times(&self, day: NaiveDate) -> Vec<NaiveTime> {
        self.days
            .get(&day)
            .map(|buckets| buckets.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Messages of one bucket, one day, or the whole store, in order.
    #[must_use]
    pub fn messages(&self, day: Option<NaiveDate>, time: Option<NaiveTime>) -> Vec<&Message> {
        let days = day.map_or_else(|| self.days(None, &DateRange::unbounded()), |day| vec![day]);

        let mut result = Vec::new();
        for day in days {
            let Some(buckets) = self.days.get(&day) else {
                continue;
            };
            match time {
                Some(time) => result.extend(buckets.get(&time).into_iter().flatten()),
                None => result.extend(buckets.values().flatten()),
            }
        }
        result
    }

    /// All messages on days within `range`, in order.
    #[must_use]
    pub fn messages_between(&self, range: &DateRange) -> Vec<&Message> {
        self.days(None, range)
            .into_iter()
            .flat_map(|day| self.messages(Some(day), None))
            .collect()
    }

    /// Display names of all senders of received messages, sorted.
    #[must_use]
    pub fn senders(&self) -> Vec<&str> {
        self.senders.iter().map(String::as_str).collect()
    }
}
