//! Closure extraction from NEA datastore records
//!
//! Each record describes one hawker centre and carries up to four quarterly
//! cleaning windows plus one "other works" window. Every window with both
//! dates present becomes a [`ClosureEntry`]. Windows marked `TBC` are
//! reported and dropped; an other-works remark of `nil` means there is no
//! other-works window at all.

use crate::models::{is_unconfirmed, ClosureEntry, ClosureFeed, PassReport, SkipReason, Stage};
use serde::Deserialize;
use serde_json::{Map, Value};
use sgdata_common::Coordinates;

/// Remark value meaning "no other works scheduled"
pub const NO_OTHER_WORKS: &str = "nil";

const DEFAULT_NAME: &str = "Unknown";
const DEFAULT_OTHER_WORKS: &str = "Other Works";

/// Raw datastore record, kept as an open JSON object
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SourceRecord(pub Map<String, Value>);

impl SourceRecord {
    /// Trimmed, non-empty string field
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) => Some(s.trim()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// Numeric field, accepting JSON numbers and numeric strings
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        self.text("name").unwrap_or(DEFAULT_NAME)
    }

    pub fn location(&self) -> Option<Coordinates> {
        Coordinates::new(self.number("latitude_hc")?, self.number("longitude_hc")?)
    }
}

/// Extract all closure entries from a page of records
pub fn extract_closures(records: &[SourceRecord]) -> ClosureFeed {
    let mut entries = Vec::new();
    let mut report = PassReport::new();

    for record in records {
        let name = record.name();
        let location = record.location();

        for quarter in 1..=4 {
            let kind = format!("Q{} Cleaning", quarter);
            let start = record.text(&format!("q{}_cleaningstartdate", quarter));
            let end = record.text(&format!("q{}_cleaningenddate", quarter));
            push_window(&mut entries, &mut report, name, &kind, start, end, location);
        }

        let remarks = record.text("remarks_other_works");
        if remarks.is_some_and(|r| r.eq_ignore_ascii_case(NO_OTHER_WORKS)) {
            continue;
        }
        let kind = remarks.unwrap_or(DEFAULT_OTHER_WORKS);
        let start = record.text("other_works_startdate");
        let end = record.text("other_works_enddate");
        push_window(&mut entries, &mut report, name, kind, start, end, location);
    }

    ClosureFeed {
        entries,
        skipped: report.skipped,
    }
}

fn push_window(
    entries: &mut Vec<ClosureEntry>,
    report: &mut PassReport,
    name: &str,
    kind: &str,
    start: Option<&str>,
    end: Option<&str>,
    location: Option<Coordinates>,
) {
    // Half-specified windows are common in the dataset and not worth reporting
    let (Some(start), Some(end)) = (start, end) else {
        return;
    };

    if is_unconfirmed(start) || is_unconfirmed(end) {
        report.record(Stage::Extract, name, kind, SkipReason::Unconfirmed);
        return;
    }

    entries.push(ClosureEntry {
        name: name.to_string(),
        kind: kind.to_string(),
        start: start.to_string(),
        end: end.to_string(),
        location,
    });
}
