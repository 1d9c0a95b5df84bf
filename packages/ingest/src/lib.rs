#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loads the pipeline's input layers from disk.
//!
//! The alert table comes from the GFW download (CSV) or a previously
//! exported `GeoJSON`. The vereda boundaries, the rural-section panel and
//! the optional study area are `GeoJSON` feature collections. Every loaded
//! collection is tagged with its [`Crs`]; only WGS84 input is accepted.
//!
//! Loading is a pure read: a missing file, an empty layer or a missing
//! required column aborts with a [`LoadError`].

pub mod alerts;
pub mod boundaries;
pub mod properties;
pub mod schema;
pub mod study_area;

use std::path::{Path, PathBuf};

use gfw_alerts_spatial::Crs;
use thiserror::Error;

pub use alerts::{AlertLayer, load_alerts};
pub use boundaries::{load_admin_boundaries, load_section_panel};
pub use schema::SectionSchema;
pub use study_area::{StudyArea, load_study_area};

/// Errors that can occur while loading an input layer.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input file does not exist.
    #[error("File not found: {}", path.display())]
    NotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// Reading the file failed.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV decoding failed.
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// `GeoJSON` decoding failed.
    #[error("GeoJSON error in {}: {source}", path.display())]
    GeoJson {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<geojson::Error>,
    },

    /// The file is valid `GeoJSON` but not a `FeatureCollection`.
    #[error("{} is not a GeoJSON FeatureCollection", path.display())]
    NotFeatureCollection {
        /// Path being read.
        path: PathBuf,
    },

    /// The layer has zero usable features.
    #[error("{} has no features", path.display())]
    Empty {
        /// Path being read.
        path: PathBuf,
    },

    /// Required attribute columns are absent.
    #[error("{} is missing required columns: {}", path.display(), columns.join(", "))]
    MissingColumns {
        /// Path being read.
        path: PathBuf,
        /// Names of the absent columns.
        columns: Vec<String>,
    },

    /// A cell could not be parsed.
    #[error("{} row {row}: invalid {column} value {value:?}", path.display())]
    InvalidValue {
        /// Path being read.
        path: PathBuf,
        /// One-based data row (features count as rows).
        row: usize,
        /// Column holding the bad value.
        column: String,
        /// The raw value.
        value: String,
    },

    /// The layer declares a CRS other than WGS84.
    #[error("{} uses unsupported CRS {crs}; expected {}", path.display(), Crs::Wgs84)]
    UnsupportedCrs {
        /// Path being read.
        path: PathBuf,
        /// CRS name found in the file.
        crs: String,
    },

    /// The file extension is not one the loader understands.
    #[error("Unsupported file type: {} (expected .csv, .geojson or .json)", path.display())]
    UnsupportedFormat {
        /// Path being read.
        path: PathBuf,
    },
}

/// Fails with [`LoadError::NotFound`] when `path` is not a file.
fn ensure_exists(path: &Path) -> Result<(), LoadError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LoadError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Reads a whole text file, mapping failures to [`LoadError`].
fn read_text(path: &Path) -> Result<String, LoadError> {
    ensure_exists(path)?;
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Lowercased file extension, if any.
fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}
