//! Radius-linked clustering constrained to rural sections.
//!
//! Two alerts share a cluster exactly when they have the same section code
//! and a chain of alerts links them, each hop at most
//! `2 × buffer_radius_m` long (their buffers touch). Sections are processed
//! in code order; within a section, ids go to components in the order
//! their first alert appears in the input. Alerts without a section code
//! each become a singleton after all sectioned alerts.

use std::collections::BTreeMap;
use std::sync::Arc;

use gfw_alerts_alert_models::{ClusterId, ClusteredAlert, EnrichedAlert};
use gfw_alerts_spatial::{PointIndex, UtmZone};

use crate::progress::{ProgressCallback, units};

/// Disjoint-set forest with path halving and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// `n` singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Representative of the set containing `x`.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merges the sets of `a` and `b`. Returns `false` if they were
    /// already one set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
        true
    }
}

/// Hands out cluster ids from 1 upward.
#[derive(Debug, Clone)]
pub struct ClusterIdGenerator {
    next: u32,
}

impl Default for ClusterIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterIdGenerator {
    /// A generator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next id.
    pub const fn next_id(&mut self) -> ClusterId {
        let id = ClusterId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.next - 1
    }
}

/// Labels each alert of one section group.
///
/// `members` are positions into `alerts`, in input order. Returns one id
/// per member, in the same order.
fn cluster_group(
    alerts: &[EnrichedAlert],
    members: &[usize],
    link_distance: f64,
    generator: &mut ClusterIdGenerator,
) -> Vec<ClusterId> {
    let lon_lat: Vec<(f64, f64)> = members
        .iter()
        .map(|&i| (alerts[i].alert.longitude, alerts[i].alert.latitude))
        .collect();
    // `None` only for an empty group, which has nothing to label.
    let Some(zone) = UtmZone::estimate(lon_lat.iter().copied()) else {
        return Vec::new();
    };
    let points: Vec<[f64; 2]> = lon_lat
        .into_iter()
        .map(|(lon, lat)| {
            let (x, y) = zone.project(lon, lat);
            [x, y]
        })
        .collect();

    let index = PointIndex::new(&points);
    let mut sets = UnionFind::new(points.len());
    for (i, point) in points.iter().enumerate() {
        for j in index.within(*point, link_distance) {
            if j > i {
                sets.union(i, j);
            }
        }
    }

    let mut component_ids: BTreeMap<usize, ClusterId> = BTreeMap::new();
    let labels: Vec<ClusterId> = (0..members.len())
        .map(|local| {
            let root = sets.find(local);
            *component_ids
                .entry(root)
                .or_insert_with(|| generator.next_id())
        })
        .collect();

    log::debug!(
        "Section group of {} alerts in zone {zone}: {} clusters",
        members.len(),
        component_ids.len()
    );
    labels
}

/// Assigns every enriched alert to a cluster.
///
/// Returns the alerts in input order, each with its id. `buffer_radius_m`
/// must be positive; [`PipelineConfig::validate`](crate::config::PipelineConfig::validate)
/// guarantees this for configured runs.
#[must_use]
pub fn cluster_alerts(
    alerts: Vec<EnrichedAlert>,
    buffer_radius_m: f64,
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<ClusteredAlert> {
    let link_distance = 2.0 * buffer_radius_m;

    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut unsectioned = Vec::new();
    for (i, alert) in alerts.iter().enumerate() {
        match alert.section_code() {
            Some(code) => groups.entry(code).or_default().push(i),
            None => unsectioned.push(i),
        }
    }

    progress.start("Clustering alerts", units(groups.len() + unsectioned.len()));

    let mut generator = ClusterIdGenerator::new();
    // (input position, id); every alert is in exactly one group or unsectioned.
    let mut labels: Vec<(usize, ClusterId)> = Vec::with_capacity(alerts.len());

    for members in groups.values() {
        let ids = cluster_group(&alerts, members, link_distance, &mut generator);
        labels.extend(members.iter().copied().zip(ids));
        progress.inc(1);
    }

    if !unsectioned.is_empty() {
        log::warn!(
            "{} alerts fall outside every rural section; each forms its own cluster",
            unsectioned.len()
        );
    }
    for &i in &unsectioned {
        labels.push((i, generator.next_id()));
        progress.inc(1);
    }

    let section_count = groups.len();
    drop(groups);

    labels.sort_unstable_by_key(|&(i, _)| i);
    debug_assert_eq!(labels.len(), alerts.len(), "every alert gets one label");

    progress.finish(&format!("{} clusters", generator.issued()));
    log::info!(
        "Clustered {} alerts into {} clusters across {section_count} sections",
        alerts.len(),
        generator.issued()
    );

    alerts
        .into_iter()
        .zip(labels)
        .map(|(enriched, (_, cluster_id))| ClusteredAlert {
            cluster_id,
            enriched,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use gfw_alerts_alert_models::{
        Alert, AlertConfidences, ConfidenceLevel, SectionAttributes, SectionRecord,
    };

    use super::*;
    use crate::progress::null_progress;

    /// Meters per degree of longitude at the equator, close enough for
    /// placing test points.
    const M_PER_DEG: f64 = 111_320.0;

    fn enriched(lon: f64, lat: f64, section: Option<&str>) -> EnrichedAlert {
        EnrichedAlert {
            alert: Alert {
                longitude: lon,
                latitude: lat,
                alert_date: None,
                confidences: AlertConfidences {
                    gfw_integrated: Some(ConfidenceLevel::Highest),
                    ..AlertConfidences::default()
                },
            },
            admin: None,
            section: section.map(|code| SectionAttributes {
                record: SectionRecord {
                    section_code: Some(code.to_string()),
                    ..SectionRecord::default()
                },
                ..SectionAttributes::default()
            }),
        }
    }

    /// Alert `meters` east of (-75, 0).
    fn east(meters: f64, section: Option<&str>) -> EnrichedAlert {
        enriched(-75.0 + meters / M_PER_DEG, 0.0, section)
    }

    fn ids(clustered: &[ClusteredAlert]) -> Vec<u32> {
        clustered.iter().map(|c| c.cluster_id.0).collect()
    }

    #[test]
    fn union_find_merges_transitively() {
        let mut sets = UnionFind::new(4);
        assert!(sets.union(0, 1));
        assert!(sets.union(1, 2));
        assert!(!sets.union(0, 2));
        assert_eq!(sets.find(0), sets.find(2));
        assert_ne!(sets.find(0), sets.find(3));
    }

    #[test]
    fn generator_starts_at_one() {
        let mut generator = ClusterIdGenerator::new();
        assert_eq!(generator.next_id(), ClusterId(1));
        assert_eq!(generator.next_id(), ClusterId(2));
        assert_eq!(generator.issued(), 2);
    }

    #[test]
    fn links_are_transitive() {
        let r = 250.0;
        let alerts = vec![
            east(0.0, Some("S1")),
            east(1.5 * r, Some("S1")),
            east(3.0 * r, Some("S1")),
        ];
        let clustered = cluster_alerts(alerts, r, &null_progress());
        assert_eq!(ids(&clustered), vec![1, 1, 1]);
    }

    #[test]
    fn distant_alerts_split() {
        let r = 250.0;
        let alerts = vec![east(0.0, Some("S1")), east(2.2 * r, Some("S1"))];
        let clustered = cluster_alerts(alerts, r, &null_progress());
        assert_eq!(ids(&clustered), vec![1, 2]);
    }

    #[test]
    fn sections_are_never_merged() {
        let alerts = vec![east(0.0, Some("S2")), east(1.0, Some("S1"))];
        let clustered = cluster_alerts(alerts, 1000.0, &null_progress());
        // S1 sorts first, so its alert gets id 1.
        assert_eq!(ids(&clustered), vec![2, 1]);
    }

    #[test]
    fn single_alert_section_is_a_singleton() {
        let clustered = cluster_alerts(vec![east(0.0, Some("S1"))], 250.0, &null_progress());
        assert_eq!(ids(&clustered), vec![1]);
    }

    #[test]
    fn dense_section_forms_one_cluster() {
        let alerts: Vec<EnrichedAlert> = (0..100)
            .map(|i| {
                let dx = f64::from(i % 10);
                let dy = f64::from(i / 10);
                enriched(-75.0 + dx / M_PER_DEG, 4.0 + dy / M_PER_DEG, Some("S1"))
            })
            .collect();
        let clustered = cluster_alerts(alerts, 250.0, &null_progress());
        let unique: BTreeSet<u32> = ids(&clustered).into_iter().collect();
        assert_eq!(unique.len(), 1);
        assert_eq!(clustered.len(), 100);
    }

    #[test]
    fn unsectioned_alerts_are_singletons_after_sections() {
        let alerts = vec![
            east(0.0, None),
            east(1.0, Some("S1")),
            east(2.0, None),
            east(3.0, Some("S1")),
        ];
        let clustered = cluster_alerts(alerts, 250.0, &null_progress());
        assert_eq!(ids(&clustered), vec![2, 1, 3, 1]);
    }

    #[test]
    fn ids_follow_first_appearance_within_section() {
        let r = 100.0;
        let alerts = vec![
            east(5000.0, Some("S1")),
            east(0.0, Some("S1")),
            east(5050.0, Some("S1")),
        ];
        let clustered = cluster_alerts(alerts, r, &null_progress());
        assert_eq!(ids(&clustered), vec![1, 2, 1]);
    }

    #[test]
    fn every_cluster_has_one_section() {
        let alerts = vec![
            east(0.0, Some("A")),
            east(10.0, Some("B")),
            east(20.0, Some("A")),
            east(30.0, Some("B")),
            east(40.0, None),
        ];
        let clustered = cluster_alerts(alerts, 500.0, &null_progress());
        let mut sections: BTreeMap<ClusterId, BTreeSet<Option<String>>> = BTreeMap::new();
        for c in &clustered {
            sections
                .entry(c.cluster_id)
                .or_default()
                .insert(c.enriched.section_code().map(ToString::to_string));
        }
        assert!(sections.values().all(|s| s.len() == 1));
        assert_eq!(sections.len(), 3);
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(cluster_alerts(Vec::new(), 250.0, &null_progress()).is_empty());
    }

    #[test]
    fn group_labels_cover_every_member() {
        let alerts = vec![
            east(0.0, Some("A")),
            east(10.0, Some("B")),
            east(20.0, Some("A")),
        ];
        let mut generator = ClusterIdGenerator::new();

        let labels = cluster_group(&alerts, &[0, 2], 500.0, &mut generator);
        assert_eq!(labels, vec![ClusterId(1), ClusterId(1)]);

        assert!(cluster_group(&alerts, &[], 500.0, &mut generator).is_empty());
        assert_eq!(generator.issued(), 1);
    }

    #[test]
    fn interleaved_input_keeps_order_and_ids() {
        let r = 250.0;
        let alerts = vec![
            east(0.0, Some("B")),
            east(10.0, Some("A")),
            east(20.0, None),
            east(30.0, Some("A")),
            east(5000.0, Some("B")),
        ];
        let longitudes: Vec<f64> = alerts.iter().map(|a| a.alert.longitude).collect();

        let clustered = cluster_alerts(alerts, r, &null_progress());

        assert_eq!(ids(&clustered), vec![2, 1, 4, 1, 3]);
        let out: Vec<f64> = clustered.iter().map(|c| c.enriched.alert.longitude).collect();
        assert_eq!(out, longitudes);
    }
}
