use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{ArchiveError, Result};
use crate::formality::{self, FormalityScorer};
use crate::time_utils;

/// Medium tags used by the stock connectors.
pub mod mediums {
    pub const GMAIL: &str = "Gmail";
    pub const GCHAT: &str = "Gchat";
    pub const FACEBOOK: &str = "Facebook";
    pub const LINKEDIN: &str = "LinkedIn";
}

// ── MonthKey ──────────────────────────────────────────────────────────────────

/// A calendar month, ordered chronologically.
///
/// Serialises as `"YYYY-MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Returns `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month `dt` falls in, on the calendar of `dt`'s own timezone.
    pub fn of<Z: TimeZone>(dt: &DateTime<Z>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Calendar months elapsed from `start` to `self`.  Negative when `self`
    /// precedes `start`.
    pub fn months_since(&self, start: MonthKey) -> i64 {
        12 * i64::from(self.year - start.year) + i64::from(self.month) - i64::from(start.month)
    }

    /// The month `n` months after `self`.
    pub fn plus_months(&self, n: u32) -> Self {
        let zero_based = i64::from(self.month - 1) + i64::from(n);
        Self {
            year: self.year + (zero_based / 12) as i32,
            month: (zero_based % 12) as u32 + 1,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ArchiveError::InvalidTimestamp(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// A single communication event with one correspondent over one medium.
///
/// Fields are private: a message cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct Message {
    correspondent: String,
    medium: String,
    contents: String,
    send_date: DateTime<Utc>,
}

impl Message {
    /// Build a message, rejecting an empty correspondent or medium.
    pub fn new(
        correspondent: impl Into<String>,
        medium: impl Into<String>,
        contents: impl Into<String>,
        send_date: DateTime<Utc>,
    ) -> Result<Self> {
        let correspondent = correspondent.into();
        let medium = medium.into();
        if correspondent.trim().is_empty() {
            return Err(ArchiveError::MissingField("correspondent"));
        }
        if medium.trim().is_empty() {
            return Err(ArchiveError::MissingField("medium"));
        }
        Ok(Self {
            correspondent,
            medium,
            contents: contents.into(),
            send_date,
        })
    }

    /// Build a message from a loosely-typed connector record.
    ///
    /// Naive send dates (no offset) are read as local time in `tz`.
    pub fn from_raw(raw: RawMessage, tz: &Tz) -> Result<Self> {
        let send_date = raw.send_date.ok_or(ArchiveError::MissingField("send_date"))?;
        let send_date = time_utils::parse_timestamp(&send_date, tz)
            .ok_or(ArchiveError::InvalidTimestamp(send_date))?;
        Self::new(
            raw.correspondent
                .ok_or(ArchiveError::MissingField("correspondent"))?,
            raw.medium.ok_or(ArchiveError::MissingField("medium"))?,
            raw.contents.unwrap_or_default(),
            send_date,
        )
    }

    pub fn correspondent(&self) -> &str {
        &self.correspondent
    }

    pub fn medium(&self) -> &str {
        &self.medium
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn send_date(&self) -> DateTime<Utc> {
        self.send_date
    }

    /// Character count of the contents.
    pub fn volume(&self) -> u64 {
        self.contents.chars().count() as u64
    }

    /// Formality under the default scorer.
    pub fn formality(&self) -> f64 {
        formality::DEFAULT_FORMALITY
    }

    /// Formality under `scorer`, clamped into `[0.0, 1.0]`.
    pub fn formality_with(&self, scorer: &dyn FormalityScorer) -> f64 {
        formality::normalize_score(scorer.score(self))
    }

    /// The UTC calendar month the message was sent in.
    pub fn month_key(&self) -> MonthKey {
        MonthKey::of(&self.send_date)
    }

    /// The calendar month the message was sent in, as seen from `tz`.
    pub fn month_key_in(&self, tz: &Tz) -> MonthKey {
        MonthKey::of(&self.send_date.with_timezone(tz))
    }

    /// Flat summary record including the derived measures.
    pub fn summary(&self, scorer: &dyn FormalityScorer) -> MessageSummary {
        MessageSummary {
            correspondent: self.correspondent.clone(),
            medium: self.medium.clone(),
            contents: self.contents.clone(),
            send_date: self.send_date,
            volume: self.volume(),
            formality: self.formality_with(scorer),
        }
    }
}

/// A connector record before validation.  Every field is optional so that a
/// missing field surfaces as [`ArchiveError::MissingField`] rather than a
/// generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub correspondent: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub contents: Option<String>,
    #[serde(default)]
    pub send_date: Option<String>,
}

impl TryFrom<RawMessage> for Message {
    type Error = ArchiveError;

    fn try_from(raw: RawMessage) -> Result<Self> {
        Message::from_raw(raw, &Tz::UTC)
    }
}

/// Serialisable view of a [`Message`] with its derived measures attached.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub correspondent: String,
    pub medium: String,
    pub contents: String,
    pub send_date: DateTime<Utc>,
    pub volume: u64,
    pub formality: f64,
}

// ── MessageArchive ────────────────────────────────────────────────────────────

/// An immutable multiset of messages plus the labels of the sources they were
/// pulled from.
///
/// Message order carries no meaning and identical messages are kept as
/// separate entries.
#[derive(Debug, Clone, Default)]
pub struct MessageArchive {
    sources: BTreeSet<String>,
    messages: Vec<Message>,
}

impl MessageArchive {
    /// An archive with no messages and no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// An archive of `messages` pulled from a single source.
    ///
    /// An empty `source` label is not recorded.
    pub fn from_source(source: impl Into<String>, messages: Vec<Message>) -> Self {
        let source = source.into();
        let mut sources = BTreeSet::new();
        if !source.is_empty() {
            sources.insert(source);
        }
        Self { sources, messages }
    }

    /// An archive with an explicit set of source labels.
    pub fn with_sources(sources: BTreeSet<String>, messages: Vec<Message>) -> Self {
        Self { sources, messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn sources(&self) -> &BTreeSet<String> {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Distinct correspondents across all messages.
    pub fn correspondents(&self) -> BTreeSet<&str> {
        self.messages.iter().map(Message::correspondent).collect()
    }

    /// Distinct mediums across all messages.
    pub fn mediums(&self) -> BTreeSet<&str> {
        self.messages.iter().map(Message::medium).collect()
    }

    /// The message with the smallest send date.  Ties resolve to any one of
    /// the tied messages.
    pub fn earliest(&self) -> Result<&Message> {
        self.messages
            .iter()
            .min_by_key(|m| m.send_date)
            .ok_or(ArchiveError::EmptyArchive)
    }

    /// The message with the largest send date.
    pub fn latest(&self) -> Result<&Message> {
        self.messages
            .iter()
            .max_by_key(|m| m.send_date)
            .ok_or(ArchiveError::EmptyArchive)
    }

    /// Calendar months spanned by the archive in UTC, counting both ends, so
    /// a single-day archive has age 1.
    pub fn age_in_months(&self) -> Result<u32> {
        self.age_in_months_in(&Tz::UTC)
    }

    /// [`age_in_months`](Self::age_in_months) with months cut in `tz`.
    pub fn age_in_months_in(&self, tz: &Tz) -> Result<u32> {
        let start = self.earliest()?.month_key_in(tz);
        let end = self.latest()?.month_key_in(tz);
        Ok(end.months_since(start) as u32 + 1)
    }

    /// Whether both archives hold the same multiset of messages, ignoring
    /// order and sources.
    pub fn same_messages(&self, other: &MessageArchive) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut counts: HashMap<&Message, i64> = HashMap::new();
        for m in &self.messages {
            *counts.entry(m).or_default() += 1;
        }
        for m in &other.messages {
            *counts.entry(m).or_default() -= 1;
        }
        counts.values().all(|&c| c == 0)
    }
}

impl From<Vec<Message>> for MessageArchive {
    fn from(messages: Vec<Message>) -> Self {
        Self {
            sources: BTreeSet::new(),
            messages,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formality::ConstantScorer;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn msg(who: &str, medium: &str, contents: &str, at: &str) -> Message {
        Message::new(who, medium, contents, ts(at)).unwrap()
    }

    // ── MonthKey ──────────────────────────────────────────────────────────────

    #[test]
    fn test_month_key_rejects_invalid_month() {
        assert!(MonthKey::new(2024, 0).is_none());
        assert!(MonthKey::new(2024, 13).is_none());
        assert!(MonthKey::new(2024, 12).is_some());
    }

    #[test]
    fn test_months_since_across_year_boundary() {
        let start = MonthKey::new(2023, 11).unwrap();
        let end = MonthKey::new(2024, 2).unwrap();
        assert_eq!(end.months_since(start), 3);
        assert_eq!(start.months_since(end), -3);
        assert_eq!(start.months_since(start), 0);
    }

    #[test]
    fn test_plus_months_wraps_year() {
        let start = MonthKey::new(2023, 11).unwrap();
        assert_eq!(start.plus_months(0), start);
        assert_eq!(start.plus_months(2), MonthKey::new(2024, 1).unwrap());
        assert_eq!(start.plus_months(14), MonthKey::new(2025, 1).unwrap());
    }

    #[test]
    fn test_month_key_display_and_parse() {
        let key = MonthKey::new(2024, 3).unwrap();
        assert_eq!(key.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<MonthKey>().unwrap(), key);
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("March".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_serialises_as_string() {
        let key = MonthKey::new(2010, 9).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2010-09\"");
    }

    // ── Message ───────────────────────────────────────────────────────────────

    #[test]
    fn test_volume_counts_characters() {
        assert_eq!(msg("Alice", "Gmail", "hello there", "2024-02-10T00:00:00Z").volume(), 11);
        assert_eq!(msg("Alice", "Gmail", "", "2024-02-10T00:00:00Z").volume(), 0);
        // Multi-byte characters count once each.
        assert_eq!(msg("Alice", "Gmail", "héllo", "2024-02-10T00:00:00Z").volume(), 5);
    }

    #[test]
    fn test_default_formality_is_one() {
        let m = msg("Alice", "Gmail", "hi", "2024-01-05T00:00:00Z");
        assert_eq!(m.formality(), 1.0);
        assert_eq!(m.formality_with(&ConstantScorer::default()), 1.0);
    }

    #[test]
    fn test_formality_with_custom_scorer() {
        let m = msg("Alice", "Gmail", "hi", "2024-01-05T00:00:00Z");
        let half = |_: &Message| 0.5;
        assert_eq!(m.formality_with(&half), 0.5);
    }

    #[test]
    fn test_month_key_uses_utc_by_default() {
        let m = msg("Alice", "Gmail", "hi", "2024-01-31T23:30:00Z");
        assert_eq!(m.month_key(), MonthKey::new(2024, 1).unwrap());
    }

    #[test]
    fn test_month_key_in_timezone() {
        let m = msg("Alice", "Gmail", "hi", "2024-01-31T23:30:00Z");
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        assert_eq!(m.month_key_in(&tokyo), MonthKey::new(2024, 2).unwrap());
    }

    #[test]
    fn test_new_rejects_empty_correspondent() {
        let err = Message::new("  ", "Gmail", "hi", ts("2024-01-05T00:00:00Z")).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingField("correspondent")));
    }

    #[test]
    fn test_new_rejects_empty_medium() {
        let err = Message::new("Alice", "", "hi", ts("2024-01-05T00:00:00Z")).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingField("medium")));
    }

    #[test]
    fn test_deserialize_valid_record() {
        let json = r#"{"correspondent":"Jim","medium":"Gmail","contents":"Heyaaaaaaaaa","send_date":"2010-09-01T00:00:00Z"}"#;
        let m: Message = serde_json::from_str(json).unwrap();
        assert_eq!(m.correspondent(), "Jim");
        assert_eq!(m.medium(), "Gmail");
        assert_eq!(m.volume(), 12);
        assert_eq!(m.month_key(), MonthKey::new(2010, 9).unwrap());
    }

    #[test]
    fn test_deserialize_rejects_missing_send_date() {
        let json = r#"{"correspondent":"Jim","medium":"Gmail","contents":"hey"}"#;
        let err = serde_json::from_str::<Message>(json).unwrap_err();
        assert!(err.to_string().contains("send_date"));
    }

    #[test]
    fn test_from_raw_rejects_bad_timestamp() {
        let raw = RawMessage {
            correspondent: Some("Jim".into()),
            medium: Some("Gmail".into()),
            contents: Some("hey".into()),
            send_date: Some("not a date".into()),
        };
        let err = Message::from_raw(raw, &Tz::UTC).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_from_raw_missing_contents_is_empty() {
        let raw = RawMessage {
            correspondent: Some("Jim".into()),
            medium: Some("Gchat".into()),
            contents: None,
            send_date: Some("2014-09-02T10:00:00Z".into()),
        };
        let m = Message::from_raw(raw, &Tz::UTC).unwrap();
        assert_eq!(m.contents(), "");
        assert_eq!(m.volume(), 0);
    }

    #[test]
    fn test_summary_includes_derived_measures() {
        let m = msg("Alice", "Gmail", "hello there", "2024-02-10T00:00:00Z");
        let summary = m.summary(&ConstantScorer::default());
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["correspondent"], "Alice");
        assert_eq!(value["volume"], 11);
        assert_eq!(value["formality"], 1.0);
    }

    // ── MessageArchive ────────────────────────────────────────────────────────

    #[test]
    fn test_empty_archive_queries() {
        let archive = MessageArchive::new();
        assert!(archive.is_empty());
        assert!(archive.correspondents().is_empty());
        assert!(archive.mediums().is_empty());
        assert!(matches!(archive.earliest(), Err(ArchiveError::EmptyArchive)));
        assert!(matches!(archive.latest(), Err(ArchiveError::EmptyArchive)));
        assert!(matches!(archive.age_in_months(), Err(ArchiveError::EmptyArchive)));
    }

    #[test]
    fn test_default_archives_do_not_share_storage() {
        let a = MessageArchive::default();
        let b = MessageArchive::from(vec![msg("Alice", "Gmail", "hi", "2024-01-05T00:00:00Z")]);
        assert!(a.is_empty());
        assert_eq!(b.len(), 1);
        assert!(MessageArchive::default().is_empty());
    }

    #[test]
    fn test_correspondents_and_mediums_are_distinct() {
        let archive = MessageArchive::from(vec![
            msg("Alice", "Gmail", "a", "2024-01-05T00:00:00Z"),
            msg("Alice", "Gchat", "b", "2024-01-06T00:00:00Z"),
            msg("Bob", "Gmail", "c", "2024-01-07T00:00:00Z"),
        ]);
        let people: Vec<&str> = archive.correspondents().into_iter().collect();
        let mediums: Vec<&str> = archive.mediums().into_iter().collect();
        assert_eq!(people, vec!["Alice", "Bob"]);
        assert_eq!(mediums, vec!["Gchat", "Gmail"]);
    }

    #[test]
    fn test_earliest_and_latest_ignore_insertion_order() {
        let archive = MessageArchive::from(vec![
            msg("Bob", "Gmail", "middle", "2024-02-01T00:00:00Z"),
            msg("Alice", "Gmail", "last", "2024-03-01T00:00:00Z"),
            msg("Carol", "Gmail", "first", "2024-01-01T00:00:00Z"),
        ]);
        assert_eq!(archive.earliest().unwrap().contents(), "first");
        assert_eq!(archive.latest().unwrap().contents(), "last");
    }

    #[test]
    fn test_age_single_day_is_one() {
        let archive = MessageArchive::from(vec![
            msg("Alice", "Gmail", "a", "2024-01-05T08:00:00Z"),
            msg("Alice", "Gmail", "b", "2024-01-05T20:00:00Z"),
        ]);
        assert_eq!(archive.age_in_months().unwrap(), 1);
    }

    #[test]
    fn test_age_follows_calendar_boundaries() {
        // Two days apart but in different months.
        let archive = MessageArchive::from(vec![
            msg("Alice", "Gmail", "a", "2024-01-31T12:00:00Z"),
            msg("Alice", "Gmail", "b", "2024-02-01T12:00:00Z"),
        ]);
        assert_eq!(archive.age_in_months().unwrap(), 2);

        // Fifty-nine days apart within three calendar months.
        let archive = MessageArchive::from(vec![
            msg("Alice", "Gmail", "a", "2024-01-01T00:00:00Z"),
            msg("Alice", "Gmail", "b", "2024-02-29T00:00:00Z"),
        ]);
        assert_eq!(archive.age_in_months().unwrap(), 2);
    }

    #[test]
    fn test_age_across_years() {
        let archive = MessageArchive::from(vec![
            msg("Alice", "Gmail", "a", "2022-11-15T00:00:00Z"),
            msg("Alice", "Gmail", "b", "2024-02-03T00:00:00Z"),
        ]);
        assert_eq!(archive.age_in_months().unwrap(), 16);
    }

    #[test]
    fn test_from_source_records_label() {
        let archive = MessageArchive::from_source("Gmail", vec![]);
        assert!(archive.sources().contains("Gmail"));
        assert!(MessageArchive::from_source("", vec![]).sources().is_empty());
    }

    #[test]
    fn test_same_messages_is_order_insensitive_but_counts_duplicates() {
        let a = msg("Alice", "Gmail", "a", "2024-01-01T00:00:00Z");
        let b = msg("Bob", "Gmail", "b", "2024-01-02T00:00:00Z");

        let x = MessageArchive::from(vec![a.clone(), b.clone()]);
        let y = MessageArchive::from(vec![b.clone(), a.clone()]);
        assert!(x.same_messages(&y));

        let dup = MessageArchive::from(vec![a.clone(), a.clone()]);
        let pair = MessageArchive::from(vec![a, b]);
        assert!(!dup.same_messages(&pair));
    }
}
