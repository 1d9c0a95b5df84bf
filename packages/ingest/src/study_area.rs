//! Study area polygon: the region alerts are requested for.

use std::path::Path;

use geo::{BoundingRect as _, Coord, Polygon, Rect};

use crate::boundaries::parse_polygon_layer;
use crate::{LoadError, read_text};

/// The study area: its first polygon and the extent of the whole layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyArea {
    /// First polygon of the first feature.
    pub polygon: Polygon<f64>,
    /// Total bounds of every feature in the layer.
    pub bounds: Rect<f64>,
}

impl StudyArea {
    /// Exterior ring of [`Self::polygon`] as `[lon, lat]` pairs, closed.
    #[must_use]
    pub fn exterior_ring(&self) -> Vec<[f64; 2]> {
        self.polygon
            .exterior()
            .coords()
            .map(|c| [c.x, c.y])
            .collect()
    }

    /// [`Self::bounds`] as a polygon.
    #[must_use]
    pub fn bbox_polygon(&self) -> Polygon<f64> {
        self.bounds.to_polygon()
    }
}

/// Loads a study area layer.
///
/// # Errors
///
/// Returns [`LoadError`] if the file is missing, unreadable, not WGS84 or
/// holds no polygon.
pub fn load_study_area(path: &Path) -> Result<StudyArea, LoadError> {
    let study_area = parse_study_area(&read_text(path)?, path)?;
    log::info!(
        "Loaded study area from {} ({} ring vertices)",
        path.display(),
        study_area.polygon.exterior().0.len()
    );
    Ok(study_area)
}

/// Parses a study area from `GeoJSON` text.
///
/// # Errors
///
/// See [`load_study_area`].
pub fn parse_study_area(text: &str, path: &Path) -> Result<StudyArea, LoadError> {
    let layer = parse_polygon_layer(text, path, &[], |_| ())?;
    let empty = || LoadError::Empty {
        path: path.to_path_buf(),
    };

    let polygon = layer
        .boundaries
        .first()
        .and_then(|b| b.polygon.0.first())
        .cloned()
        .ok_or_else(empty)?;

    let bounds = layer
        .boundaries
        .iter()
        .filter_map(|b| b.polygon.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
        .ok_or_else(empty)?;

    Ok(StudyArea { polygon, bounds })
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "Macarena"},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[-74.0, 2.0], [-73.0, 2.0], [-73.0, 3.0], [-74.0, 3.0], [-74.0, 2.0]]],
                    [[[-72.0, 2.0], [-71.5, 2.0], [-71.5, 2.5], [-72.0, 2.0]]]
                ]}
            },
            {
                "type": "Feature",
                "properties": null,
                "geometry": {"type": "Polygon", "coordinates": [
                    [[-75.0, 1.0], [-74.5, 1.0], [-74.5, 1.5], [-75.0, 1.0]]
                ]}
            }
        ]
    }"#;

    #[test]
    fn takes_first_polygon_ring() {
        let area = parse_study_area(AREA, Path::new("area.geojson")).unwrap();
        let ring = area.exterior_ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], [-74.0, 2.0]);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn bounds_cover_every_feature() {
        let area = parse_study_area(AREA, Path::new("area.geojson")).unwrap();
        assert_eq!(area.bounds.min(), Coord { x: -75.0, y: 1.0 });
        assert_eq!(area.bounds.max(), Coord { x: -71.5, y: 3.0 });
        assert_eq!(area.bbox_polygon().exterior().0.len(), 5);
    }
}
