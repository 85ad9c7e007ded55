//! iCalendar document generation
//!
//! Each closure becomes an all-day event. RFC 5545 treats the DTEND of a
//! `VALUE=DATE` event as exclusive, so the stored end date is the day after
//! the last closed day. [`CalendarEvent::end`] keeps the inclusive date; the
//! exclusive one only exists in the serialized document.

use crate::models::{ClosureEntry, PassReport, SkipReason, Stage};
use chrono::{DateTime, Days, NaiveDate, Utc};
use icalendar::{Calendar, Component, Event, EventLike};
use sha2::{Digest, Sha256};

/// Timezone advertised by every generated calendar
pub const DEFAULT_TIMEZONE: &str = "Asia/Singapore";

const UID_DOMAIN: &str = "sgdata";

/// One all-day closure event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub uid: String,
    pub summary: String,
    pub description: String,
    /// First closed day
    pub start: NaiveDate,
    /// Last closed day (inclusive)
    pub end: NaiveDate,
    /// Day after `end`, as written to DTEND
    pub end_exclusive: NaiveDate,
}

impl CalendarEvent {
    /// Build the event for `entry` inside the calendar named `calendar`
    pub fn from_entry(calendar: &str, entry: &ClosureEntry) -> Result<Self, SkipReason> {
        let (start, end) = entry.date_range()?;
        let end_exclusive = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| SkipReason::InvalidDate(entry.end.clone()))?;

        Ok(Self {
            uid: event_uid(calendar, entry),
            summary: format!("[Closure] {} ({})", entry.name, entry.kind),
            description: format!(
                "{} closed for {}\n{} to {}",
                entry.name, entry.kind, entry.start, entry.end
            ),
            start,
            end,
            end_exclusive,
        })
    }
}

/// Stable UID so re-runs on unchanged data produce the same events
fn event_uid(calendar: &str, entry: &ClosureEntry) -> String {
    let mut hasher = Sha256::new();
    let parts = [
        calendar,
        entry.name.as_str(),
        entry.kind.as_str(),
        entry.start.as_str(),
        entry.end.as_str(),
    ];
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\x1f");
    }
    let digest = hasher.finalize();
    format!("{:x}@{}", digest, UID_DOMAIN)
}

/// Named set of closure events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDocument {
    pub name: String,
    pub description: String,
    pub timezone: String,
    pub events: Vec<CalendarEvent>,
}

impl CalendarDocument {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize as an iCalendar (`.ics`) document
    ///
    /// `stamp` becomes the DTSTAMP of every event.
    pub fn to_ics(&self, stamp: DateTime<Utc>) -> String {
        let mut calendar = Calendar::new();
        calendar
            .name(&self.name)
            .description(&self.description)
            .timezone(&self.timezone);

        for event in &self.events {
            calendar.push(
                Event::new()
                    .uid(&event.uid)
                    .timestamp(stamp)
                    .summary(&event.summary)
                    .description(&event.description)
                    .starts(event.start)
                    .ends(event.end_exclusive)
                    .done(),
            );
        }

        calendar.to_string()
    }
}

/// Turns clustered closures into calendar documents
#[derive(Debug, Clone)]
pub struct CalendarBuilder {
    timezone: String,
    generated_at: DateTime<Utc>,
}

impl CalendarBuilder {
    pub fn new(timezone: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            timezone: timezone.into(),
            generated_at,
        }
    }

    /// Build a document named `name` from `entries`
    ///
    /// Entries whose dates cannot be used are recorded in the returned report
    /// and left out; the document is built from the rest.
    pub fn build(&self, name: &str, entries: &[&ClosureEntry]) -> (CalendarDocument, PassReport) {
        let mut report = PassReport::new();
        let mut events = Vec::with_capacity(entries.len());

        for entry in entries {
            match CalendarEvent::from_entry(name, entry) {
                Ok(event) => events.push(event),
                Err(reason) => report.record(Stage::Calendar, &entry.name, &entry.kind, reason),
            }
        }

        let document = CalendarDocument {
            name: name.to_string(),
            description: name.to_string(),
            timezone: self.timezone.clone(),
            events,
        };
        (document, report)
    }

    /// Serialize with this builder's generation timestamp
    pub fn serialize(&self, document: &CalendarDocument) -> String {
        document.to_ics(self.generated_at)
    }
}
