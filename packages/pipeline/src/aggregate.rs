//! Per-cluster bounding boxes and representative rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use gfw_alerts_alert_models::{AdminAttributes, ClusterId, ClusteredAlert, SectionAttributes};
use gfw_alerts_spatial::UtmZone;
use geo::{Coord, LineString, Point, Polygon, Rect};

/// Envelope of a cluster's buffered members.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBoundingBox {
    /// Cluster this box belongs to.
    pub cluster_id: ClusterId,
    /// The projected rectangle's four corners in WGS84, closed.
    pub polygon: Polygon<f64>,
    /// Rectangle in [`Self::zone`] meters.
    pub projected: Rect<f64>,
    /// UTM zone the rectangle was computed in.
    pub zone: UtmZone,
}

/// One representative row per cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    /// Cluster id.
    pub cluster_id: ClusterId,
    /// Number of member alerts.
    pub member_count: usize,
    /// Mean longitude/latitude of the members.
    pub centroid: Point<f64>,
    /// Earliest member alert date.
    pub first_alert_date: Option<NaiveDate>,
    /// Latest member alert date.
    pub last_alert_date: Option<NaiveDate>,
    /// Vereda of the first member.
    pub admin: Option<AdminAttributes>,
    /// Rural section of the first member.
    pub section: Option<SectionAttributes>,
}

/// Members of each cluster in input order, keyed by id.
fn members_by_cluster(alerts: &[ClusteredAlert]) -> BTreeMap<ClusterId, Vec<&ClusteredAlert>> {
    let mut clusters: BTreeMap<ClusterId, Vec<&ClusteredAlert>> = BTreeMap::new();
    for alert in alerts {
        clusters.entry(alert.cluster_id).or_default().push(alert);
    }
    clusters
}

/// Computes one bounding box per cluster, ordered by id.
///
/// The union of `buffer_m` discs around the members has the members'
/// projected envelope grown by `buffer_m` on each side as its envelope, so
/// no buffer polygons are built.
#[must_use]
pub fn cluster_bounding_boxes(alerts: &[ClusteredAlert], buffer_m: f64) -> Vec<ClusterBoundingBox> {
    let boxes: Vec<ClusterBoundingBox> = members_by_cluster(alerts)
        .into_iter()
        .filter_map(|(cluster_id, members)| bounding_box(cluster_id, &members, buffer_m))
        .collect();
    log::info!("Computed {} cluster bounding boxes", boxes.len());
    boxes
}

fn bounding_box(
    cluster_id: ClusterId,
    members: &[&ClusteredAlert],
    buffer_m: f64,
) -> Option<ClusterBoundingBox> {
    let lon_lat: Vec<(f64, f64)> = members
        .iter()
        .map(|m| (m.enriched.alert.longitude, m.enriched.alert.latitude))
        .collect();
    let zone = UtmZone::estimate(lon_lat.iter().copied())?;

    let (mut min, mut max) = (
        Coord {
            x: f64::INFINITY,
            y: f64::INFINITY,
        },
        Coord {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        },
    );
    for (lon, lat) in lon_lat {
        let (x, y) = zone.project(lon, lat);
        min.x = min.x.min(x);
        min.y = min.y.min(y);
        max.x = max.x.max(x);
        max.y = max.y.max(y);
    }

    let projected = Rect::new(
        Coord {
            x: min.x - buffer_m,
            y: min.y - buffer_m,
        },
        Coord {
            x: max.x + buffer_m,
            y: max.y + buffer_m,
        },
    );

    let (lo, hi) = (projected.min(), projected.max());
    let corners = [
        lo,
        Coord { x: hi.x, y: lo.y },
        hi,
        Coord { x: lo.x, y: hi.y },
        lo,
    ];
    let ring: LineString<f64> = corners
        .into_iter()
        .map(|c| zone.unproject_coord(c))
        .collect();

    Some(ClusterBoundingBox {
        cluster_id,
        polygon: Polygon::new(ring, vec![]),
        projected,
        zone,
    })
}

/// Builds one representative row per cluster, ordered by id.
#[must_use]
pub fn summarize_clusters(alerts: &[ClusteredAlert]) -> Vec<ClusterSummary> {
    members_by_cluster(alerts)
        .into_iter()
        .filter_map(|(cluster_id, members)| {
            let first = members.first()?;
            #[allow(clippy::cast_precision_loss)]
            let n = members.len() as f64;
            let (sum_lon, sum_lat) = members.iter().fold((0.0, 0.0), |(x, y), m| {
                (x + m.enriched.alert.longitude, y + m.enriched.alert.latitude)
            });
            let dates: Vec<NaiveDate> = members
                .iter()
                .filter_map(|m| m.enriched.alert.alert_date)
                .collect();

            Some(ClusterSummary {
                cluster_id,
                member_count: members.len(),
                centroid: Point::new(sum_lon / n, sum_lat / n),
                first_alert_date: dates.iter().min().copied(),
                last_alert_date: dates.iter().max().copied(),
                admin: first.enriched.admin.clone(),
                section: first.enriched.section.clone(),
            })
        })
        .collect()
}
