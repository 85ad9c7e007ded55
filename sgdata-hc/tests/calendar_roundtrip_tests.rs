//! Emitted `.ics` documents parse back to the closure ranges they came from

use chrono::{Days, NaiveDate, TimeZone, Utc};
use icalendar::{Calendar, CalendarComponent, Component, DatePerhapsTime, EventLike};
use sgdata_common::Coordinates;
use sgdata_hc::calendar::{CalendarBuilder, DEFAULT_TIMEZONE};
use sgdata_hc::ClosureEntry;

fn entry(name: &str, kind: &str, start: &str, end: &str) -> ClosureEntry {
    ClosureEntry {
        name: name.to_string(),
        kind: kind.to_string(),
        start: start.to_string(),
        end: end.to_string(),
        location: Coordinates::new(1.30, 103.80),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn as_date(value: Option<DatePerhapsTime>) -> NaiveDate {
    match value {
        Some(DatePerhapsTime::Date(date)) => date,
        other => panic!("expected an all-day date, got {:?}", other),
    }
}

#[test]
fn test_inclusive_ranges_recovered() {
    let entries = vec![
        entry("Foo Market", "Q1 Cleaning", "01/01/2025", "03/01/2025"),
        entry("Foo Market", "Repairs to roof", "28/02/2025", "01/03/2025"),
        entry("Bar Food Centre", "Q4 Cleaning", "31/12/2025", "31/12/2025"),
    ];
    let refs: Vec<&ClosureEntry> = entries.iter().collect();

    let builder = CalendarBuilder::new(DEFAULT_TIMEZONE, Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap());
    let (document, report) = builder.build("Hawker Centre Closures near Test MRT", &refs);
    assert!(report.is_clean());

    let ics = builder.serialize(&document);
    let parsed: Calendar = ics.parse().unwrap();

    let events: Vec<_> = parsed
        .components
        .iter()
        .filter_map(CalendarComponent::as_event)
        .collect();
    assert_eq!(events.len(), 3);

    let mut ranges: Vec<(String, NaiveDate, NaiveDate)> = events
        .iter()
        .map(|event| {
            let start = as_date(event.get_start());
            let end_exclusive = as_date(event.get_end());
            let end = end_exclusive.checked_sub_days(Days::new(1)).unwrap();
            (event.get_summary().unwrap_or_default().to_string(), start, end)
        })
        .collect();
    ranges.sort();

    assert_eq!(
        ranges,
        vec![
            ("[Closure] Bar Food Centre (Q4 Cleaning)".to_string(), date(2025, 12, 31), date(2025, 12, 31)),
            ("[Closure] Foo Market (Q1 Cleaning)".to_string(), date(2025, 1, 1), date(2025, 1, 3)),
            ("[Closure] Foo Market (Repairs to roof)".to_string(), date(2025, 2, 28), date(2025, 3, 1)),
        ]
    );
}

#[test]
fn test_event_identity_stable_across_builds() {
    let entries = vec![entry("Foo Market", "Q1 Cleaning", "01/01/2025", "03/01/2025")];
    let refs: Vec<&ClosureEntry> = entries.iter().collect();

    let first = CalendarBuilder::new(DEFAULT_TIMEZONE, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    let second = CalendarBuilder::new(DEFAULT_TIMEZONE, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());

    let uid = |builder: &CalendarBuilder| {
        let (document, _) = builder.build("Cal", &refs);
        let parsed: Calendar = builder.serialize(&document).parse().unwrap();
        parsed
            .components
            .iter()
            .filter_map(CalendarComponent::as_event)
            .filter_map(|event| event.get_uid().map(str::to_string))
            .collect::<Vec<_>>()
    };

    assert_eq!(uid(&first), uid(&second));
    assert_eq!(uid(&first).len(), 1);
}
