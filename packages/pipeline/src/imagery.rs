//! Satellite imagery requests, one per cluster bounding box.
//!
//! The requests are consumed by an external image downloader. When it
//! finds no usable image between `start_date` and `end_date` it retries
//! from `fallback_start_date`.

use chrono::{Days, NaiveDate};
use gfw_alerts_alert_models::ClusterId;
use serde::Serialize;

use crate::aggregate::{ClusterBoundingBox, ClusterSummary};
use crate::config::ReportConfig;

/// Date range imagery is searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageryWindow {
    /// First day searched.
    pub start: NaiveDate,
    /// Last day searched.
    pub end: NaiveDate,
    /// Earlier start used when the window has no usable image.
    pub fallback_start: NaiveDate,
}

impl ImageryWindow {
    /// A window with its fallback start `fallback_days` before `start`.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate, fallback_days: u32) -> Self {
        let fallback_start = start
            .checked_sub_days(Days::new(u64::from(fallback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start,
            end,
            fallback_start,
        }
    }

    /// The configured window, completed from the clusters' alert dates
    /// where the configuration leaves a bound open. `None` if a bound is
    /// still unknown.
    #[must_use]
    pub fn resolve(config: &ReportConfig, clusters: &[ClusterSummary]) -> Option<Self> {
        let start = config
            .imagery_start
            .or_else(|| clusters.iter().filter_map(|c| c.first_alert_date).min())?;
        let end = config
            .imagery_end
            .or_else(|| clusters.iter().filter_map(|c| c.last_alert_date).max())?;
        Some(Self::new(start, end.max(start), config.fallback_days))
    }
}

/// One imagery download for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageryRequest {
    /// Cluster the image covers.
    pub cluster_id: ClusterId,
    /// Region to clip to, a WGS84 `GeoJSON` polygon.
    pub region: geojson::Geometry,
    /// First day searched.
    pub start_date: NaiveDate,
    /// Last day searched.
    pub end_date: NaiveDate,
    /// Earlier start for the retry.
    pub fallback_start_date: NaiveDate,
    /// File name the image is written to.
    pub output_file: String,
}

/// File name of a cluster's image.
#[must_use]
pub fn image_file_name(cluster_id: ClusterId) -> String {
    format!("sentinel_cluster_{cluster_id}.tif")
}

/// Builds one request per bounding box, in box order.
#[must_use]
pub fn plan_imagery(boxes: &[ClusterBoundingBox], window: ImageryWindow) -> Vec<ImageryRequest> {
    boxes
        .iter()
        .map(|bbox| ImageryRequest {
            cluster_id: bbox.cluster_id,
            region: geojson::Geometry::new(geojson::Value::from(&bbox.polygon)),
            start_date: window.start,
            end_date: window.end,
            fallback_start_date: window.fallback_start,
            output_file: image_file_name(bbox.cluster_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use gfw_alerts_spatial::UtmZone;
    use geo::{Coord, Point, Rect};

    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn summary(first: Option<NaiveDate>, last: Option<NaiveDate>) -> ClusterSummary {
        ClusterSummary {
            cluster_id: ClusterId(1),
            member_count: 1,
            centroid: Point::new(0.0, 0.0),
            first_alert_date: first,
            last_alert_date: last,
            admin: None,
            section: None,
        }
    }

    #[test]
    fn fallback_reaches_back() {
        let window = ImageryWindow::new(date(4, 1), date(6, 30), 90);
        assert_eq!(window.fallback_start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn window_defaults_to_alert_dates() {
        let clusters = [
            summary(Some(date(2, 10)), Some(date(3, 1))),
            summary(Some(date(1, 5)), Some(date(1, 20))),
        ];
        let window = ImageryWindow::resolve(&ReportConfig::default(), &clusters).unwrap();
        assert_eq!(window.start, date(1, 5));
        assert_eq!(window.end, date(3, 1));
    }

    #[test]
    fn configured_bounds_win() {
        let config = ReportConfig {
            imagery_start: Some(date(1, 1)),
            ..ReportConfig::default()
        };
        let clusters = [summary(Some(date(2, 10)), Some(date(3, 1)))];
        let window = ImageryWindow::resolve(&config, &clusters).unwrap();
        assert_eq!(window.start, date(1, 1));
        assert_eq!(window.end, date(3, 1));
    }

    #[test]
    fn undated_alerts_without_config_have_no_window() {
        let clusters = [summary(None, None)];
        assert!(ImageryWindow::resolve(&ReportConfig::default(), &clusters).is_none());
    }

    #[test]
    fn one_request_per_box() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let boxes = vec![ClusterBoundingBox {
            cluster_id: ClusterId(7),
            polygon: rect.to_polygon(),
            projected: rect,
            zone: UtmZone { number: 31, north: true },
        }];
        let requests = plan_imagery(&boxes, ImageryWindow::new(date(1, 1), date(3, 31), 90));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].output_file, "sentinel_cluster_7.tif");

        let json = serde_json::to_value(&requests[0]).unwrap();
        assert_eq!(json["cluster_id"], 7);
        assert_eq!(json["start_date"], "2025-01-01");
        assert_eq!(json["region"]["type"], "Polygon");
    }
}
