//! Closure entries, reference points and the per-pass skip report

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sgdata_common::Coordinates;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Date format used by the NEA dataset
pub const SOURCE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Placeholder for dates that are not yet confirmed
pub const UNCONFIRMED: &str = "TBC";

/// One scheduled closure of a facility
///
/// `start` and `end` keep the literal `DD/MM/YYYY` strings from the source;
/// they are parsed when the calendar is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureEntry {
    /// Facility name
    pub name: String,
    /// Closure reason, e.g. "Q1 Cleaning" or the other-works remark
    #[serde(rename = "type")]
    pub kind: String,
    pub start: String,
    pub end: String,
    /// `None` when the source record had missing or non-numeric coordinates
    pub location: Option<Coordinates>,
}

impl ClosureEntry {
    /// Inclusive date range of the closure
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), SkipReason> {
        let start = parse_date(&self.start)?;
        let end = parse_date(&self.end)?;
        if end < start {
            return Err(SkipReason::EndBeforeStart {
                start: self.start.clone(),
                end: self.end.clone(),
            });
        }
        Ok((start, end))
    }
}

/// Parse a `DD/MM/YYYY` date
pub fn parse_date(value: &str) -> Result<NaiveDate, SkipReason> {
    let trimmed = value.trim();
    if is_unconfirmed(trimmed) {
        return Err(SkipReason::Unconfirmed);
    }
    NaiveDate::parse_from_str(trimmed, SOURCE_DATE_FORMAT)
        .map_err(|_| SkipReason::InvalidDate(value.to_string()))
}

pub(crate) fn is_unconfirmed(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(UNCONFIRMED)
}

/// Named geographic anchor (an MRT/LRT station)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub name: String,
    pub location: Coordinates,
}

/// Everything extracted from the source feed
///
/// This is the cached form of the datastore fetch, so skips found during
/// extraction are still reported on later runs served from cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosureFeed {
    pub entries: Vec<ClosureEntry>,
    #[serde(default)]
    pub skipped: Vec<SkipRecord>,
}

/// Why an entry was left out
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SkipReason {
    #[error("date not yet confirmed (TBC)")]
    Unconfirmed,

    #[error("unparseable date '{0}'")]
    InvalidDate(String),

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("missing or invalid coordinates")]
    InvalidCoordinates,
}

/// Pipeline stage that dropped an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Extract,
    Cluster,
    Calendar,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extract => "extract",
            Stage::Cluster => "cluster",
            Stage::Calendar => "calendar",
        };
        f.write_str(s)
    }
}

/// One dropped entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub stage: Stage,
    pub name: String,
    pub kind: String,
    pub reason: SkipReason,
}

/// Skips collected over one pass of the pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub skipped: Vec<SkipRecord>,
}

impl PassReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a skipped entry
    pub fn record(&mut self, stage: Stage, name: &str, kind: &str, reason: SkipReason) {
        warn!(%stage, name = %name, kind = %kind, reason = %reason, "Skipping closure entry");
        self.skipped.push(SkipRecord {
            stage,
            name: name.to_string(),
            kind: kind.to_string(),
            reason,
        });
    }

    /// Append records collected elsewhere without logging them again
    pub fn extend(&mut self, records: impl IntoIterator<Item = SkipRecord>) {
        self.skipped.extend(records);
    }

    pub fn merge(&mut self, other: PassReport) {
        self.skipped.extend(other.skipped);
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.skipped.iter().filter(|r| r.stage == stage).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: &str, end: &str) -> ClosureEntry {
        ClosureEntry {
            name: "Foo Market".to_string(),
            kind: "Q1 Cleaning".to_string(),
            start: start.to_string(),
            end: end.to_string(),
            location: Coordinates::new(1.30, 103.80),
        }
    }

    #[test]
    fn test_date_range_inclusive() {
        let (start, end) = entry("01/01/2025", "03/01/2025").date_range().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }

    #[test]
    fn test_single_day_range() {
        let (start, end) = entry("15/06/2025", "15/06/2025").date_range().unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn test_unconfirmed_date() {
        assert_eq!(entry("TBC", "03/01/2025").date_range(), Err(SkipReason::Unconfirmed));
        assert_eq!(entry("01/01/2025", "tbc").date_range(), Err(SkipReason::Unconfirmed));
    }

    #[test]
    fn test_invalid_date() {
        assert_eq!(
            entry("2025-01-01", "03/01/2025").date_range(),
            Err(SkipReason::InvalidDate("2025-01-01".to_string()))
        );
        assert_eq!(
            entry("31/02/2025", "03/03/2025").date_range(),
            Err(SkipReason::InvalidDate("31/02/2025".to_string()))
        );
    }

    #[test]
    fn test_end_before_start() {
        assert!(matches!(
            entry("05/01/2025", "03/01/2025").date_range(),
            Err(SkipReason::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let json = serde_json::to_value(entry("01/01/2025", "03/01/2025")).unwrap();
        assert_eq!(json["type"], "Q1 Cleaning");
        assert_eq!(json["location"]["lat"], 1.30);
    }

    #[test]
    fn test_report_counts_by_stage() {
        let mut report = PassReport::new();
        report.record(Stage::Extract, "A", "Q1 Cleaning", SkipReason::Unconfirmed);
        report.record(Stage::Cluster, "B", "Q2 Cleaning", SkipReason::InvalidCoordinates);
        report.record(Stage::Cluster, "C", "Q2 Cleaning", SkipReason::InvalidCoordinates);

        assert!(!report.is_clean());
        assert_eq!(report.count(Stage::Extract), 1);
        assert_eq!(report.count(Stage::Cluster), 2);
        assert_eq!(report.count(Stage::Calendar), 0);
    }
}
