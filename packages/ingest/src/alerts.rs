//! Alert table loading from CSV or point `GeoJSON`.

use std::io::Read;
use std::path::Path;
use std::str::FromStr as _;

use chrono::NaiveDate;
use gfw_alerts_alert_models::{
    ALERT_DATE_COLUMN, Alert, AlertConfidences, AlertSource, ConfidenceLevel, LATITUDE_COLUMN,
    LONGITUDE_COLUMN,
};
use gfw_alerts_spatial::Crs;
use geojson::JsonObject;

use crate::boundaries::parse_feature_collection;
use crate::properties::{missing_keys, property_string};
use crate::{LoadError, ensure_exists, extension, read_text};

/// Date format of [`ALERT_DATE_COLUMN`].
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A loaded alert table.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertLayer {
    /// CRS of the alert coordinates.
    pub crs: Crs,
    /// Alerts in file order.
    pub alerts: Vec<Alert>,
}

impl AlertLayer {
    /// Number of alerts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Whether the table holds no alerts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Loads the alert table, choosing the reader by file extension
/// (`.csv`, `.geojson` or `.json`).
///
/// # Errors
///
/// Returns [`LoadError`] if the file is missing, has an unknown
/// extension, has no rows, lacks a required column, or holds an
/// unparseable coordinate, date or confidence label.
pub fn load_alerts(path: &Path) -> Result<AlertLayer, LoadError> {
    let layer = match extension(path).as_deref() {
        Some("csv") => {
            ensure_exists(path)?;
            let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_alerts_csv(file, path)?
        }
        Some("geojson" | "json") => parse_alerts_geojson(&read_text(path)?, path)?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    log::info!("Loaded {} alerts from {}", layer.len(), path.display());
    Ok(layer)
}

/// Columns every alert table must carry.
fn required_columns() -> Vec<&'static str> {
    let mut columns = vec![LONGITUDE_COLUMN, LATITUDE_COLUMN];
    columns.extend(AlertSource::all().iter().map(|s| s.confidence_column()));
    columns
}

/// Parses an alert CSV with a header row.
///
/// # Errors
///
/// See [`load_alerts`].
pub fn parse_alerts_csv<R: Read>(reader: R, path: &Path) -> Result<AlertLayer, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = required_columns()
        .into_iter()
        .filter(|c| position(*c).is_none())
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let lon_idx = position(LONGITUDE_COLUMN).unwrap_or_default();
    let lat_idx = position(LATITUDE_COLUMN).unwrap_or_default();
    let date_idx = position(ALERT_DATE_COLUMN);
    let confidence_idx: Vec<(AlertSource, usize)> = AlertSource::all()
        .iter()
        .filter_map(|&s| position(s.confidence_column()).map(|i| (s, i)))
        .collect();

    let mut alerts = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let row = i + 1;
        let cell = |idx: usize| record.get(idx).unwrap_or_default();

        let longitude = parse_coordinate(cell(lon_idx), path, row, LONGITUDE_COLUMN)?;
        let latitude = parse_coordinate(cell(lat_idx), path, row, LATITUDE_COLUMN)?;
        let alert_date = date_idx
            .map(|idx| parse_date(cell(idx), path, row))
            .transpose()?
            .flatten();

        let mut confidences = AlertConfidences::default();
        for &(source, idx) in &confidence_idx {
            confidences.set(source, parse_confidence(cell(idx), path, row, source)?);
        }

        alerts.push(Alert {
            longitude,
            latitude,
            alert_date,
            confidences,
        });
    }

    if alerts.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(AlertLayer {
        crs: Crs::Wgs84,
        alerts,
    })
}

/// Parses an alert `FeatureCollection` of `Point` features.
///
/// Features without point geometry are skipped with a warning.
///
/// # Errors
///
/// See [`load_alerts`].
pub fn parse_alerts_geojson(text: &str, path: &Path) -> Result<AlertLayer, LoadError> {
    let (crs, features) = parse_feature_collection(text, path)?;

    let Some(first) = features.first() else {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    };
    let confidence_columns: Vec<&str> = AlertSource::all()
        .iter()
        .map(|s| s.confidence_column())
        .collect();
    let missing = missing_keys(first.properties.as_ref(), &confidence_columns);
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let empty = JsonObject::new();
    let mut alerts = Vec::with_capacity(features.len());

    for (i, feature) in features.into_iter().enumerate() {
        let row = i + 1;
        let point = feature
            .geometry
            .and_then(|g| geo::Geometry::<f64>::try_from(g).ok())
            .and_then(|g| geo::Point::try_from(g).ok());
        let Some(point) = point else {
            log::warn!(
                "{}: skipping feature {row} without point geometry",
                path.display()
            );
            continue;
        };

        let props = feature.properties.as_ref().unwrap_or(&empty);
        let alert_date = property_string(props, ALERT_DATE_COLUMN)
            .map(|value| parse_date(&value, path, row))
            .transpose()?
            .flatten();

        let mut confidences = AlertConfidences::default();
        for &source in AlertSource::all() {
            let value = property_string(props, source.confidence_column()).unwrap_or_default();
            confidences.set(source, parse_confidence(&value, path, row, source)?);
        }

        alerts.push(Alert {
            longitude: point.x(),
            latitude: point.y(),
            alert_date,
            confidences,
        });
    }

    if alerts.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(AlertLayer { crs, alerts })
}

fn invalid(path: &Path, row: usize, column: &str, value: &str) -> LoadError {
    LoadError::InvalidValue {
        path: path.to_path_buf(),
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn parse_coordinate(value: &str, path: &Path, row: usize, column: &str) -> Result<f64, LoadError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(path, row, column, value))
}

/// Empty is missing; anything else must be `YYYY-MM-DD`.
fn parse_date(value: &str, path: &Path, row: usize) -> Result<Option<NaiveDate>, LoadError> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| invalid(path, row, ALERT_DATE_COLUMN, value))
}

/// Empty is missing; anything else must be a known label.
fn parse_confidence(
    value: &str,
    path: &Path,
    row: usize,
    source: AlertSource,
) -> Result<Option<ConfidenceLevel>, LoadError> {
    if value.is_empty() {
        return Ok(None);
    }
    ConfidenceLevel::from_str(value)
        .map(Some)
        .map_err(|_| invalid(path, row, source.confidence_column(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "latitude,longitude,gfw_integrated_alerts__date,gfw_integrated_alerts__confidence,umd_glad_landsat_alerts__confidence,umd_glad_sentinel2_alerts__confidence,wur_radd_alerts__confidence";

    fn csv(rows: &[&str]) -> Result<AlertLayer, LoadError> {
        let text = format!("{HEADER}\n{}\n", rows.join("\n"));
        parse_alerts_csv(text.as_bytes(), Path::new("alerts.csv"))
    }

    #[test]
    fn parses_csv_rows() {
        let layer = csv(&[
            "3.51,-74.02,2025-02-14,highest,high,not_detected,nominal",
            "3.52,-74.03,,high,,,",
        ])
        .unwrap();
        assert_eq!(layer.len(), 2);
        let first = &layer.alerts[0];
        assert!((first.longitude - -74.02).abs() < 1e-12);
        assert!((first.latitude - 3.51).abs() < 1e-12);
        assert_eq!(first.alert_date, NaiveDate::from_ymd_opt(2025, 2, 14));
        assert!(first.is_highest());
        assert_eq!(
            first.confidences.get(AlertSource::GladSentinel2),
            Some(ConfidenceLevel::NotDetected)
        );

        let second = &layer.alerts[1];
        assert_eq!(second.alert_date, None);
        assert_eq!(second.confidences.get(AlertSource::WurRadd), None);
    }

    #[test]
    fn unknown_label_is_invalid() {
        let err = csv(&["3.5,-74.0,,very_high,,,"]).unwrap_err();
        match err {
            LoadError::InvalidValue {
                row, column, value, ..
            } => {
                assert_eq!(row, 1);
                assert_eq!(column, "gfw_integrated_alerts__confidence");
                assert_eq!(value, "very_high");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_coordinate_is_invalid() {
        let err = csv(&["3.5,-74.0,,highest,,,", "north,-74.0,,highest,,,"]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { row: 2, .. }));
    }

    #[test]
    fn missing_confidence_column_is_reported() {
        let text = "latitude,longitude,gfw_integrated_alerts__confidence\n3.5,-74.0,highest\n";
        let err = parse_alerts_csv(text.as_bytes(), Path::new("a.csv")).unwrap_err();
        match err {
            LoadError::MissingColumns { columns, .. } => assert_eq!(columns.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_only_csv_is_empty() {
        let text = format!("{HEADER}\n");
        let err = parse_alerts_csv(text.as_bytes(), Path::new("a.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Empty { .. }));
    }

    #[test]
    fn parses_point_geojson() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {
                        "gfw_integrated_alerts__date": "2025-01-03",
                        "gfw_integrated_alerts__confidence": "highest",
                        "umd_glad_landsat_alerts__confidence": null,
                        "umd_glad_sentinel2_alerts__confidence": "high",
                        "wur_radd_alerts__confidence": "nominal"
                    },
                    "geometry": {"type": "Point", "coordinates": [-73.9, 3.4]}
                },
                {
                    "type": "Feature",
                    "properties": {
                        "gfw_integrated_alerts__confidence": "high",
                        "umd_glad_landsat_alerts__confidence": null,
                        "umd_glad_sentinel2_alerts__confidence": null,
                        "wur_radd_alerts__confidence": null
                    },
                    "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}
                }
            ]
        }"#;
        let layer = parse_alerts_geojson(text, Path::new("alerts.geojson")).unwrap();
        assert_eq!(layer.len(), 1);
        let alert = &layer.alerts[0];
        assert!((alert.longitude - -73.9).abs() < 1e-12);
        assert!(alert.is_highest());
        assert_eq!(alert.alert_date, NaiveDate::from_ymd_opt(2025, 1, 3));
        assert_eq!(alert.confidences.get(AlertSource::GladLandsat), None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_alerts(Path::new("alerts.parquet")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
    }
}
