//! Radius clustering of closures around reference points
//!
//! Membership is a radius test, not a partition: a closure joins the group
//! of every reference point within `radius_km` (inclusive), so one hawker
//! centre can show up in the calendars of several nearby stations.

use crate::models::{ClosureEntry, PassReport, ReferencePoint, SkipReason, Stage};
use sgdata_common::Coordinates;
use std::collections::BTreeMap;
use tracing::debug;

/// Reference points keyed by name, iterated in name order
pub type ReferencePoints = BTreeMap<String, Coordinates>;

/// Index reference points by name; a later duplicate replaces an earlier one
pub fn reference_map(points: impl IntoIterator<Item = ReferencePoint>) -> ReferencePoints {
    points
        .into_iter()
        .map(|point| (point.name, point.location))
        .collect()
}

/// Result of one clustering pass
#[derive(Debug, Default)]
pub struct Clusters<'a> {
    /// Every reference point, mapped to the entries within radius (possibly none)
    pub groups: BTreeMap<String, Vec<&'a ClosureEntry>>,
    pub report: PassReport,
}

impl<'a> Clusters<'a> {
    /// Groups that will produce a calendar
    pub fn nonempty(&self) -> impl Iterator<Item = (&String, &Vec<&'a ClosureEntry>)> + '_ {
        self.groups.iter().filter(|(_, entries)| !entries.is_empty())
    }
}

/// Assign each entry to every reference point within `radius_km`
///
/// Entries keep their input order inside each group. Entries without valid
/// coordinates are reported and left out of every group.
pub fn cluster<'a>(entries: &'a [ClosureEntry], points: &ReferencePoints, radius_km: f64) -> Clusters<'a> {
    let mut groups: BTreeMap<String, Vec<&'a ClosureEntry>> =
        points.keys().map(|name| (name.clone(), Vec::new())).collect();
    let mut report = PassReport::new();

    for entry in entries {
        let Some(location) = entry.location.filter(Coordinates::is_valid) else {
            report.record(Stage::Cluster, &entry.name, &entry.kind, SkipReason::InvalidCoordinates);
            continue;
        };

        for (name, point) in points {
            if location.distance_km(point) <= radius_km {
                if let Some(group) = groups.get_mut(name) {
                    group.push(entry);
                }
            }
        }
    }

    debug!(
        entries = entries.len(),
        points = points.len(),
        radius_km,
        nonempty = groups.values().filter(|g| !g.is_empty()).count(),
        "Clustered closures"
    );

    Clusters { groups, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(name: &str, lat: f64, lon: f64) -> ClosureEntry {
        ClosureEntry {
            name: name.to_string(),
            kind: "Q1 Cleaning".to_string(),
            start: "01/01/2025".to_string(),
            end: "03/01/2025".to_string(),
            location: Coordinates::new(lat, lon),
        }
    }

    fn points(list: &[(&str, f64, f64)]) -> ReferencePoints {
        list.iter()
            .map(|(name, lat, lon)| (name.to_string(), Coordinates { lat: *lat, lon: *lon }))
            .collect()
    }

    fn names(group: &[&ClosureEntry]) -> Vec<String> {
        group.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn test_identical_location_always_included() {
        let entries = vec![entry("Foo Market", 1.30, 103.80)];
        let clusters = cluster(&entries, &points(&[("Test MRT", 1.30, 103.80)]), 0.0);
        assert_eq!(names(&clusters.groups["Test MRT"]), vec!["Foo Market"]);
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        let station = Coordinates { lat: 1.30, lon: 103.80 };
        let entries = vec![entry("Edge", 1.31, 103.80)];
        let exact = entries[0].location.unwrap().distance_km(&station);
        let pts = points(&[("S", station.lat, station.lon)]);

        let at_radius = cluster(&entries, &pts, exact);
        assert_eq!(at_radius.groups["S"].len(), 1);

        let one_ulp_short = f64::from_bits(exact.to_bits() - 1);
        let below_radius = cluster(&entries, &pts, one_ulp_short);
        assert!(below_radius.groups["S"].is_empty());
    }

    #[test]
    fn test_multi_membership() {
        // Midway between two stations 2 km apart, radius 1.5 km
        let entries = vec![entry("Middle", 1.30, 103.80)];
        let pts = points(&[("West", 1.30, 103.791), ("East", 1.30, 103.809)]);
        let clusters = cluster(&entries, &pts, 1.5);

        assert_eq!(names(&clusters.groups["West"]), vec!["Middle"]);
        assert_eq!(names(&clusters.groups["East"]), vec!["Middle"]);
    }

    #[test]
    fn test_out_of_radius_group_is_empty() {
        let entries = vec![entry("Far", 1.45, 103.80)];
        let clusters = cluster(&entries, &points(&[("Near", 1.30, 103.80)]), 2.0);
        assert!(clusters.groups["Near"].is_empty());
        assert_eq!(clusters.nonempty().count(), 0);
    }

    #[test]
    fn test_input_order_preserved() {
        let entries = vec![
            entry("Zeta", 1.301, 103.80),
            entry("Alpha", 1.302, 103.80),
            entry("Mu", 1.300, 103.801),
        ];
        let clusters = cluster(&entries, &points(&[("S", 1.30, 103.80)]), 1.0);
        assert_eq!(names(&clusters.groups["S"]), vec!["Zeta", "Alpha", "Mu"]);
    }

    #[test]
    fn test_invalid_coordinates_skipped_but_others_processed() {
        let mut broken = entry("Broken", 0.0, 0.0);
        broken.location = None;
        let mut out_of_range = entry("Wild", 0.0, 0.0);
        out_of_range.location = Some(Coordinates { lat: 123.0, lon: 0.0 });
        let entries = vec![broken, entry("Fine", 1.30, 103.80), out_of_range];

        let clusters = cluster(&entries, &points(&[("S", 1.30, 103.80)]), 1.0);

        assert_eq!(names(&clusters.groups["S"]), vec!["Fine"]);
        assert_eq!(clusters.report.count(Stage::Cluster), 2);
        assert!(clusters
            .report
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::InvalidCoordinates));
    }

    #[test]
    fn test_no_points_gives_empty_mapping() {
        let entries = vec![entry("Foo", 1.30, 103.80)];
        let clusters = cluster(&entries, &ReferencePoints::new(), 2.0);
        assert!(clusters.groups.is_empty());
    }

    #[test]
    fn test_no_entries_gives_empty_groups() {
        let clusters = cluster(&[], &points(&[("A", 1.3, 103.8), ("B", 1.4, 103.9)]), 2.0);
        assert_eq!(clusters.groups.len(), 2);
        assert!(clusters.groups.values().all(Vec::is_empty));
    }

    #[test]
    fn test_reference_map_last_duplicate_wins() {
        let map = reference_map(vec![
            ReferencePoint { name: "Dhoby Ghaut".to_string(), location: Coordinates { lat: 1.0, lon: 103.0 } },
            ReferencePoint { name: "Dhoby Ghaut".to_string(), location: Coordinates { lat: 1.299, lon: 103.845 } },
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["Dhoby Ghaut"], Coordinates { lat: 1.299, lon: 103.845 });
    }

    proptest! {
        #[test]
        fn prop_clustering_is_deterministic(
            coords in proptest::collection::vec((1.2f64..1.5, 103.6f64..104.0), 0..30),
            radius in 0.0f64..5.0,
        ) {
            let entries: Vec<ClosureEntry> = coords
                .iter()
                .enumerate()
                .map(|(i, (lat, lon))| entry(&format!("E{}", i), *lat, *lon))
                .collect();
            let pts = points(&[("A", 1.30, 103.80), ("B", 1.35, 103.85), ("C", 1.40, 103.70)]);

            let first = cluster(&entries, &pts, radius);
            let second = cluster(&entries, &pts, radius);
            prop_assert_eq!(first.groups, second.groups);
        }

        #[test]
        fn prop_membership_matches_radius_predicate(
            lat in 1.2f64..1.5, lon in 103.6f64..104.0, radius in 0.0f64..10.0,
        ) {
            let entries = vec![entry("E", lat, lon)];
            let station = Coordinates { lat: 1.35, lon: 103.82 };
            let pts = points(&[("S", station.lat, station.lon)]);
            let clusters = cluster(&entries, &pts, radius);

            let within = entries[0].location.unwrap().distance_km(&station) <= radius;
            prop_assert_eq!(clusters.groups["S"].len(), usize::from(within));
        }
    }
}
