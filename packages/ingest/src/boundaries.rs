//! Polygon layer loading: vereda boundaries and the rural-section panel.

use std::path::Path;

use gfw_alerts_alert_models::{AdminAttributes, SectionIndicators, SectionRecord, UtilityCounts};
use gfw_alerts_spatial::{Boundary, BoundaryLayer, Crs, geometry_to_multipolygon};
use geojson::{Feature, GeoJson, JsonObject};

use crate::properties::{missing_keys, property_f64, property_string};
use crate::schema::SectionSchema;
use crate::{LoadError, read_text};

/// Vereda layer columns.
pub const ADMIN_COLUMNS: [&str; 3] = ["CODIGO_VER", "NOMB_MPIO", "NOMBRE_VER"];

/// Loads the vereda (administrative) boundary layer.
///
/// # Errors
///
/// Returns [`LoadError`] if the file is missing or unreadable, has no
/// polygon features, or lacks one of [`ADMIN_COLUMNS`].
pub fn load_admin_boundaries(path: &Path) -> Result<BoundaryLayer<AdminAttributes>, LoadError> {
    let text = read_text(path)?;
    let layer = parse_admin_boundaries(&text, path)?;
    log::info!(
        "Loaded {} vereda polygons from {}",
        layer.len(),
        path.display()
    );
    Ok(layer)
}

/// Parses a vereda layer from `GeoJSON` text. `path` is used for errors.
///
/// # Errors
///
/// See [`load_admin_boundaries`].
pub fn parse_admin_boundaries(
    text: &str,
    path: &Path,
) -> Result<BoundaryLayer<AdminAttributes>, LoadError> {
    parse_polygon_layer(text, path, &ADMIN_COLUMNS, |props| AdminAttributes {
        vereda_code: property_string(props, "CODIGO_VER"),
        municipality: property_string(props, "NOMB_MPIO"),
        vereda: property_string(props, "NOMBRE_VER"),
    })
}

/// Loads the rural-section panel, keeping only the columns named by
/// `schema` and the census utility counts.
///
/// # Errors
///
/// Returns [`LoadError`] if the file is missing or unreadable, has no
/// polygon features, or lacks one of the schema's required columns.
pub fn load_section_panel(
    path: &Path,
    schema: &SectionSchema,
) -> Result<BoundaryLayer<SectionRecord>, LoadError> {
    let text = read_text(path)?;
    let layer = parse_section_panel(&text, path, schema)?;
    log::info!(
        "Loaded {} rural sections from {}",
        layer.len(),
        path.display()
    );
    Ok(layer)
}

/// Parses a rural-section panel from `GeoJSON` text.
///
/// # Errors
///
/// See [`load_section_panel`].
pub fn parse_section_panel(
    text: &str,
    path: &Path,
    schema: &SectionSchema,
) -> Result<BoundaryLayer<SectionRecord>, LoadError> {
    let required = schema.required_columns();
    parse_polygon_layer(text, path, &required, |props| section_record(props, schema))
}

/// Extracts one panel row.
fn section_record(props: &JsonObject, schema: &SectionSchema) -> SectionRecord {
    let utilities =
        UtilityCounts::from_values(UtilityCounts::COLUMNS.map(|column| property_f64(props, column)));
    let [
        population_density,
        gdp_per_m2,
        market_access,
        elevation,
        deprivation,
        tree_cover,
    ] = schema
        .indicator_columns()
        .map(|column| property_f64(props, column));

    SectionRecord {
        municipality_code: property_string(props, &schema.municipality_code),
        section_code: property_string(props, &schema.section_code),
        housing_units: property_f64(props, &schema.housing_units),
        utilities,
        persons: property_f64(props, &schema.persons),
        indicators: SectionIndicators {
            population_density,
            gdp_per_m2,
            market_access,
            elevation,
            deprivation,
            tree_cover,
        },
    }
}

/// Parses a polygon `FeatureCollection`, checking `required` columns on
/// the first feature and mapping each feature's properties with
/// `extract`.
///
/// Features whose geometry is missing or not polygonal are skipped with a
/// warning.
///
/// # Errors
///
/// Returns [`LoadError`] on malformed `GeoJSON`, a non-WGS84 CRS, missing
/// columns, or when no polygon feature remains.
pub fn parse_polygon_layer<T, F>(
    text: &str,
    path: &Path,
    required: &[&str],
    extract: F,
) -> Result<BoundaryLayer<T>, LoadError>
where
    F: Fn(&JsonObject) -> T,
{
    let (crs, features) = parse_feature_collection(text, path)?;

    let Some(first) = features.first() else {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    };

    let missing = missing_keys(first.properties.as_ref(), required);
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let empty = JsonObject::new();
    let total = features.len();
    let mut boundaries = Vec::with_capacity(total);

    for (i, feature) in features.into_iter().enumerate() {
        let Some(polygon) = feature.geometry.and_then(geometry_to_multipolygon) else {
            log::warn!(
                "{}: skipping feature {} without polygon geometry",
                path.display(),
                i + 1
            );
            continue;
        };
        let attributes = extract(feature.properties.as_ref().unwrap_or(&empty));
        boundaries.push(Boundary {
            polygon,
            attributes,
        });
    }

    if boundaries.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    if boundaries.len() < total {
        log::warn!(
            "{}: kept {} of {total} features",
            path.display(),
            boundaries.len()
        );
    }

    Ok(BoundaryLayer { crs, boundaries })
}

/// Parses `GeoJSON` text as a `FeatureCollection` and resolves its CRS.
///
/// # Errors
///
/// Returns [`LoadError`] if the text is not valid `GeoJSON`, is not a
/// `FeatureCollection`, or declares a CRS other than WGS84.
pub(crate) fn parse_feature_collection(
    text: &str,
    path: &Path,
) -> Result<(Crs, Vec<Feature>), LoadError> {
    let geojson = text.parse::<GeoJson>().map_err(|source| LoadError::GeoJson {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(LoadError::NotFeatureCollection {
            path: path.to_path_buf(),
        });
    };

    let crs = declared_crs(collection.foreign_members.as_ref(), path)?;
    Ok((crs, collection.features))
}

/// Resolves the legacy `crs` member of a `GeoJSON` document. Absent means
/// WGS84 (RFC 7946).
fn declared_crs(foreign_members: Option<&JsonObject>, path: &Path) -> Result<Crs, LoadError> {
    let Some(crs) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(Crs::Wgs84);
    };

    let name = crs
        .pointer("/properties/name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();

    if is_wgs84_name(name) {
        Ok(Crs::Wgs84)
    } else {
        Err(LoadError::UnsupportedCrs {
            path: path.to_path_buf(),
            crs: if name.is_empty() {
                crs.to_string()
            } else {
                name.to_string()
            },
        })
    }
}

/// Accepts `EPSG:4326`, `urn:ogc:def:crs:EPSG::4326` and
/// `urn:ogc:def:crs:OGC:1.3:CRS84`.
fn is_wgs84_name(name: &str) -> bool {
    let upper = name.trim().to_ascii_uppercase();
    upper.ends_with("CRS84") || upper.ends_with("EPSG::4326") || upper.ends_with("EPSG:4326")
}
