//! `GeoJSON` and JSON writers for the pipeline's outputs.

use std::path::Path;

use gfw_alerts_alert_models::{
    ALERT_DATE_COLUMN, AlertSource, ClusteredAlert, LATITUDE_COLUMN, LONGITUDE_COLUMN,
    UtilityCounts, UtilityPercentages,
};
use gfw_alerts_ingest::{SectionSchema, StudyArea};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;

use crate::PipelineError;
use crate::aggregate::ClusterBoundingBox;

/// Clustered alerts table.
pub const CLUSTERED_ALERTS_FILE: &str = "alerts_clusters.geojson";
/// Cluster bounding boxes.
pub const BOUNDING_BOXES_FILE: &str = "cluster_bboxes.geojson";
/// Confidence summary.
pub const SUMMARY_FILE: &str = "summary.json";
/// Consolidated report.
pub const REPORT_FILE: &str = "report.json";
/// Imagery request plan.
pub const IMAGERY_FILE: &str = "imagery_requests.json";
/// Study area bounding box.
pub const STUDY_AREA_BBOX_FILE: &str = "study_area_bbox.geojson";

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Point features carrying every alert, vereda, section and cluster
/// attribute. Section columns are named as in the input panel.
#[must_use]
pub fn clustered_alerts_collection(
    alerts: &[ClusteredAlert],
    schema: &SectionSchema,
) -> FeatureCollection {
    let features = alerts
        .iter()
        .map(|clustered| {
            let enriched = &clustered.enriched;
            let alert = &enriched.alert;
            let mut props = JsonObject::new();

            props.insert(LONGITUDE_COLUMN.to_string(), alert.longitude.into());
            props.insert(LATITUDE_COLUMN.to_string(), alert.latitude.into());
            props.insert(
                ALERT_DATE_COLUMN.to_string(),
                alert.alert_date.map(|d| d.to_string()).into(),
            );
            for &source in AlertSource::all() {
                props.insert(
                    source.confidence_column().to_string(),
                    alert.confidences.get(source).map(|l| l.to_string()).into(),
                );
            }

            let admin = enriched.admin.clone().unwrap_or_default();
            props.insert("CODIGO_VER".to_string(), admin.vereda_code.into());
            props.insert("NOMB_MPIO".to_string(), admin.municipality.into());
            props.insert("NOMBRE_VER".to_string(), admin.vereda.into());

            let section = enriched.section.clone().unwrap_or_default();
            let record = section.record;
            props.insert(
                schema.municipality_code.clone(),
                record.municipality_code.into(),
            );
            props.insert(schema.section_code.clone(), record.section_code.into());
            props.insert(schema.housing_units.clone(), record.housing_units.into());
            for (column, value) in UtilityCounts::COLUMNS
                .iter()
                .zip(record.utilities.values())
            {
                props.insert((*column).to_string(), value.into());
            }
            props.insert(schema.persons.clone(), record.persons.into());

            let i = record.indicators;
            let indicators = [
                i.population_density,
                i.gdp_per_m2,
                i.market_access,
                i.elevation,
                i.deprivation,
                i.tree_cover,
            ];
            for (column, value) in schema.indicator_columns().iter().zip(indicators) {
                props.insert((*column).to_string(), value.into());
            }
            for (column, value) in UtilityPercentages::COLUMNS
                .iter()
                .zip(section.percentages.values())
            {
                props.insert((*column).to_string(), value.into());
            }

            props.insert("cluster_id".to_string(), clustered.cluster_id.0.into());

            let point = geojson::Value::Point(vec![alert.longitude, alert.latitude]);
            feature(Geometry::new(point), props)
        })
        .collect();
    collection(features)
}

/// Polygon features with a `cluster_id` property.
#[must_use]
pub fn bounding_boxes_collection(boxes: &[ClusterBoundingBox]) -> FeatureCollection {
    let features = boxes
        .iter()
        .map(|bbox| {
            let mut props = JsonObject::new();
            props.insert("cluster_id".to_string(), bbox.cluster_id.0.into());
            props.insert("utm_zone".to_string(), bbox.zone.to_string().into());
            feature(
                Geometry::new(geojson::Value::from(&bbox.polygon)),
                props,
            )
        })
        .collect();
    collection(features)
}

/// The study area's bounding box as a one-feature collection.
#[must_use]
pub fn study_area_bbox_collection(area: &StudyArea) -> FeatureCollection {
    let geometry = Geometry::new(geojson::Value::from(&area.bbox_polygon()));
    collection(vec![feature(geometry, JsonObject::new())])
}

/// Writes `value` as pretty-printed JSON, creating parent directories.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] or [`PipelineError::Json`] on failure.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Writes a `FeatureCollection`.
///
/// # Errors
///
/// See [`write_json`].
pub fn write_feature_collection(
    path: &Path,
    collection: &FeatureCollection,
) -> Result<(), PipelineError> {
    let value: JsonValue = serde_json::to_value(collection)?;
    write_json(path, &value)
}

#[cfg(test)]
mod tests {
    use gfw_alerts_alert_models::{
        AdminAttributes, Alert, AlertConfidences, ClusterId, ConfidenceLevel, EnrichedAlert,
    };
    use gfw_alerts_spatial::UtmZone;
    use geo::{Coord, Rect};

    use super::*;

    fn clustered(section: bool) -> ClusteredAlert {
        ClusteredAlert {
            cluster_id: ClusterId(4),
            enriched: EnrichedAlert {
                alert: Alert {
                    longitude: -74.5,
                    latitude: 2.25,
                    alert_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 9),
                    confidences: AlertConfidences {
                        gfw_integrated: Some(ConfidenceLevel::Highest),
                        ..AlertConfidences::default()
                    },
                },
                admin: Some(AdminAttributes {
                    municipality: Some("URIBE".to_string()),
                    ..AdminAttributes::default()
                }),
                section: section.then(Default::default),
            },
        }
    }

    #[test]
    fn alert_features_carry_all_columns() {
        let schema = SectionSchema::default();
        let fc = clustered_alerts_collection(&[clustered(false)], &schema);
        let props = fc.features[0].properties.as_ref().unwrap();

        assert_eq!(props["cluster_id"], 4);
        assert_eq!(props["NOMB_MPIO"], "URIBE");
        assert_eq!(props["gfw_integrated_alerts__confidence"], "highest");
        assert!(props["wur_radd_alerts__confidence"].is_null());
        assert_eq!(props["gfw_integrated_alerts__date"], "2025-03-09");
        assert!(props["SECR_CCNCT"].is_null());
        assert!(props["ENRG_PERC"].is_null());
        for column in schema.required_columns() {
            assert!(props.contains_key(column), "missing {column}");
        }
    }

    #[test]
    fn bbox_features_are_polygons() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let boxes = [ClusterBoundingBox {
            cluster_id: ClusterId(2),
            polygon: rect.to_polygon(),
            projected: rect,
            zone: UtmZone { number: 31, north: true },
        }];
        let fc = bounding_boxes_collection(&boxes);
        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(json["features"][0]["properties"]["cluster_id"], 2);
        assert_eq!(json["features"][0]["properties"]["utm_zone"], "31N");
    }
}
