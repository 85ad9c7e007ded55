//! Hawker closure pipeline
//!
//! `fetch closures (cached) → fetch stations (cached) → cluster → build → emit`

use crate::calendar::CalendarBuilder;
use crate::cluster::{cluster, reference_map, ReferencePoints};
use crate::config::Config;
use crate::error::{HcError, Result};
use crate::models::{ClosureEntry, ClosureFeed, PassReport, ReferencePoint};
use crate::sources::{DatastoreClient, StationsClient};
use chrono::{DateTime, Utc};
use serde_json::json;
use sgdata_common::{CacheKey, DataFile, ProcessorMeta, ResponseCache};
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, warn};

pub const PROCESSOR_NAME: &str = "Hawker Center Closures";
pub const DATA_CATEGORY: &str = "hawker-closures";
pub const DESCRIPTION: &str = "Calendars of hawker center and market closures in Singapore, \
sorted by area within 2km of MRT stations, with information provided from NEA via data.gov.sg.";

/// Output file name for the calendar of reference point `name`
pub fn calendar_filename(name: &str) -> String {
    let normalized: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    format!("{}.ics", normalized)
}

/// Calendar name for the reference point `name`
pub fn calendar_title(name: &str) -> String {
    format!("Hawker Centre Closures near {}", name)
}

pub fn closures_cache_key(dataset_id: &str) -> CacheKey {
    CacheKey::with_args("fetch_all_closures", &[json!(dataset_id)])
}

pub fn stations_cache_key(url: &str) -> CacheKey {
    CacheKey::with_args("mrt_stations", &[json!(url)])
}

/// Serialized calendars of one run and everything skipped on the way
#[derive(Debug, Default)]
pub struct Calendars {
    pub files: Vec<DataFile>,
    pub report: PassReport,
}

/// Cluster `entries` around `points` and build one calendar per nonempty group
pub fn build_calendars(
    entries: &[ClosureEntry],
    points: &ReferencePoints,
    radius_km: f64,
    builder: &CalendarBuilder,
) -> Calendars {
    let clusters = cluster(entries, points, radius_km);
    let mut report = clusters.report.clone();
    let mut files = Vec::new();
    let mut used_names = HashSet::new();

    for (point, members) in clusters.nonempty() {
        let filename = calendar_filename(point);
        if !used_names.insert(filename.clone()) {
            warn!(point = %point, file = %filename, "Calendar file name already used, skipping");
            continue;
        }

        let (document, build_report) = builder.build(&calendar_title(point), members);
        report.merge(build_report);
        if document.is_empty() {
            continue;
        }

        files.push(DataFile::new(filename, builder.serialize(&document)));
    }

    info!(
        calendars = files.len(),
        points = points.len(),
        closures = entries.len(),
        "Built closure calendars"
    );
    Calendars { files, report }
}

/// Write `files` below `out_dir`, recording each success in `meta`
///
/// A failed write is logged and does not stop the others. Returns the names
/// of the files that could not be written.
pub fn write_calendars(files: &[DataFile], out_dir: &Path, meta: &mut ProcessorMeta) -> Vec<String> {
    let mut failed = Vec::new();
    for file in files {
        match file.write(out_dir, &meta.data_category) {
            Ok(_) => meta.add_file(&file.filename),
            Err(e) => {
                error!(file = %file.filename, error = %e, "Failed to write calendar");
                failed.push(file.filename.clone());
            }
        }
    }
    failed
}

/// The hawker closure processor
pub struct HawkerClosures {
    datastore: DatastoreClient,
    stations: StationsClient,
    radius_km: f64,
    timezone: String,
}

impl HawkerClosures {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            datastore: DatastoreClient::new(&config.source)?,
            stations: StationsClient::new(&config.stations)?,
            radius_km: config.radius_km,
            timezone: config.timezone.clone(),
        })
    }

    /// Manifest record with no files yet
    pub fn meta(&self) -> ProcessorMeta {
        ProcessorMeta::new(PROCESSOR_NAME, DATA_CATEGORY, DESCRIPTION)
    }

    /// Closure feed, served from `cache` when present
    ///
    /// A fetch that stopped part way is used for this run without being
    /// cached. A fetch that failed outright yields an empty feed.
    pub async fn fetch_closures(&self, cache: &mut ResponseCache) -> ClosureFeed {
        let key = closures_cache_key(self.datastore.dataset_id());
        match cache.cached(&key, || self.datastore.fetch_all_closures()).await {
            Ok(feed) => feed,
            Err(HcError::PartialFetch { feed, pages, reason }) => {
                warn!(
                    pages,
                    closures = feed.entries.len(),
                    reason = %reason,
                    "Closure fetch incomplete, continuing with partial data"
                );
                feed
            }
            Err(e) => {
                error!(error = %e, "Closure fetch failed, continuing without closures");
                ClosureFeed::default()
            }
        }
    }

    /// Station points, served from `cache` when present
    pub async fn fetch_stations(&self, cache: &mut ResponseCache) -> Result<ReferencePoints> {
        let key = stations_cache_key(self.stations.url());
        let stations: Vec<ReferencePoint> =
            cache.cached(&key, || self.stations.fetch_stations()).await?;
        Ok(reference_map(stations))
    }

    /// Fetch, cluster and build every calendar
    ///
    /// Only a failure to obtain the station list is fatal.
    pub async fn run(&self, cache: &mut ResponseCache, generated_at: DateTime<Utc>) -> Result<Calendars> {
        let feed = self.fetch_closures(cache).await;
        let points = self.fetch_stations(cache).await?;

        let builder = CalendarBuilder::new(self.timezone.clone(), generated_at);
        let mut calendars = build_calendars(&feed.entries, &points, self.radius_km, &builder);

        let mut report = PassReport::new();
        report.extend(feed.skipped);
        report.merge(calendars.report);
        calendars.report = report;

        Ok(calendars)
    }
}
