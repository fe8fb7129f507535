//! Calendar-month bucketing of a message archive.
//!
//! [`MonthBucketAnalyzer`] cross-tabulates an archive by month, correspondent
//! and medium.  The grid it returns is dense: every correspondent and every
//! medium seen anywhere in the archive is a key in every month, with zeroed
//! stats where nothing was sent.

use std::collections::BTreeMap;

use chrono_tz::Tz;
use msgviz_core::error::{ArchiveError, Result};
use msgviz_core::formality::{ConstantScorer, FormalityScorer};
use msgviz_core::models::{MessageArchive, MonthKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ── CellStats ─────────────────────────────────────────────────────────────────

/// Totals for one (month, correspondent, medium) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStats {
    /// Number of messages.
    pub count: u64,
    /// Total characters across those messages.
    pub volume: u64,
    /// Mean formality of those messages; `0.0` for an empty cell.
    pub formality: f64,
}

// ── MonthBucket ───────────────────────────────────────────────────────────────

/// One calendar month: correspondent → medium → stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthBucket(BTreeMap<String, BTreeMap<String, CellStats>>);

impl MonthBucket {
    /// A bucket with a zeroed cell for every correspondent × medium pair.
    fn dense(correspondents: &[String], mediums: &[String]) -> Self {
        let row: BTreeMap<String, CellStats> = mediums
            .iter()
            .map(|m| (m.clone(), CellStats::default()))
            .collect();
        Self(
            correspondents
                .iter()
                .map(|c| (c.clone(), row.clone()))
                .collect(),
        )
    }

    pub fn get(&self, correspondent: &str, medium: &str) -> Option<&CellStats> {
        self.0.get(correspondent)?.get(medium)
    }

    fn get_mut(&mut self, correspondent: &str, medium: &str) -> Option<&mut CellStats> {
        self.0.get_mut(correspondent)?.get_mut(medium)
    }

    /// Medium → stats for one correspondent.
    pub fn correspondent(&self, correspondent: &str) -> Option<&BTreeMap<String, CellStats>> {
        self.0.get(correspondent)
    }

    /// All cells as `(correspondent, medium, stats)`.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str, &CellStats)> {
        self.0.iter().flat_map(|(c, row)| {
            row.iter()
                .map(move |(m, stats)| (c.as_str(), m.as_str(), stats))
        })
    }

    pub fn total_count(&self) -> u64 {
        self.cells().map(|(_, _, s)| s.count).sum()
    }

    pub fn total_volume(&self) -> u64 {
        self.cells().map(|(_, _, s)| s.volume).sum()
    }

    fn cells_mut(&mut self) -> impl Iterator<Item = &mut CellStats> {
        self.0.values_mut().flat_map(|row| row.values_mut())
    }
}

// ── AnalyticsReport ───────────────────────────────────────────────────────────

/// The analyzer's output: month buckets plus the people and mediums that key
/// them.
///
/// `months[i]` covers the calendar month `i` months after `start_month`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Month of the earliest message; `None` for an empty archive.
    pub start_month: Option<MonthKey>,
    /// Every correspondent, sorted.
    pub correspondents: Vec<String>,
    /// Every medium, sorted.
    pub mediums: Vec<String>,
    /// One bucket per calendar month spanned by the archive.
    pub months: Vec<MonthBucket>,
}

impl AnalyticsReport {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// The calendar month covered by `months[index]`.
    pub fn month_of(&self, index: usize) -> Option<MonthKey> {
        if index >= self.months.len() {
            return None;
        }
        let start = self.start_month?;
        Some(start.plus_months(u32::try_from(index).ok()?))
    }

    /// Messages counted across every bucket.
    pub fn total_count(&self) -> u64 {
        self.months.iter().map(MonthBucket::total_count).sum()
    }

    /// Characters counted across every bucket.
    pub fn total_volume(&self) -> u64 {
        self.months.iter().map(MonthBucket::total_volume).sum()
    }
}

// ── MonthBucketAnalyzer ───────────────────────────────────────────────────────

/// Buckets an archive by calendar month.
///
/// Months are cut in UTC unless [`with_timezone`](Self::with_timezone) says
/// otherwise; formality comes from a [`ConstantScorer`] unless
/// [`with_scorer`](Self::with_scorer) supplies another.
pub struct MonthBucketAnalyzer {
    scorer: Box<dyn FormalityScorer>,
    tz: Tz,
}

impl Default for MonthBucketAnalyzer {
    fn default() -> Self {
        Self {
            scorer: Box::new(ConstantScorer::default()),
            tz: Tz::UTC,
        }
    }
}

impl MonthBucketAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scorer(mut self, scorer: impl FormalityScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Build the dense month × correspondent × medium grid for `archive`.
    ///
    /// An empty archive yields an empty report.  The only error is
    /// [`ArchiveError::BucketOutOfRange`], which means the month arithmetic
    /// itself is broken.
    pub fn analyze(&self, archive: &MessageArchive) -> Result<AnalyticsReport> {
        if archive.is_empty() {
            debug!("Empty archive, no month buckets");
            return Ok(AnalyticsReport::default());
        }

        let start = archive.earliest()?.month_key_in(&self.tz);
        let bucket_count = archive.age_in_months_in(&self.tz)? as usize;

        let correspondents: Vec<String> = archive
            .correspondents()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mediums: Vec<String> = archive.mediums().into_iter().map(str::to_string).collect();

        let template = MonthBucket::dense(&correspondents, &mediums);
        let mut months = vec![template; bucket_count];

        // Formality is summed here and averaged below.
        for message in archive.messages() {
            let month = message.month_key_in(&self.tz);
            let out_of_range = || ArchiveError::BucketOutOfRange { month, start };
            let index = usize::try_from(month.months_since(start)).map_err(|_| out_of_range())?;
            let cell = months
                .get_mut(index)
                .and_then(|bucket| bucket.get_mut(message.correspondent(), message.medium()))
                .ok_or_else(out_of_range)?;

            cell.count += 1;
            cell.volume += message.volume();
            cell.formality += message.formality_with(self.scorer.as_ref());
        }

        for cell in months.iter_mut().flat_map(|bucket| bucket.cells_mut()) {
            cell.formality = if cell.count == 0 {
                0.0
            } else {
                cell.formality / cell.count as f64
            };
        }

        debug!(
            "Bucketed {} messages into {} months ({} correspondents, {} mediums) from {}",
            archive.len(),
            bucket_count,
            correspondents.len(),
            mediums.len(),
            start
        );

        Ok(AnalyticsReport {
            start_month: Some(start),
            correspondents,
            mediums,
            months,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
