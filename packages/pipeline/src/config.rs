//! Run configuration: clustering radii, panel schema and report metadata.
//!
//! A configuration is usually one of the embedded [`profiles`](crate::profiles)
//! but may also be read from a user TOML file with [`PipelineConfig::load`].

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gfw_alerts_ingest::SectionSchema;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Default days the imagery fallback window reaches back.
pub const DEFAULT_FALLBACK_DAYS: u32 = 90;

/// Full configuration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Profile name, e.g. `"default"`.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Clustering and bounding-box radii.
    pub cluster: ClusterConfig,
    /// Panel column names.
    #[serde(default)]
    pub schema: SectionSchema,
    /// Report metadata and imagery window.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Radii used by the clusterer and the aggregator, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Per-alert buffer. Two alerts link when at most twice this apart.
    pub buffer_radius_m: f64,
    /// Buffer grown around each member when computing bounding boxes.
    pub bbox_buffer_m: f64,
}

/// Report metadata. Everything here is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Reporting quarter label (`TRIMESTRE`).
    pub quarter: Option<String>,
    /// Reporting year (`ANIO`).
    pub year: Option<i32>,
    /// Logo image shown in the report.
    pub logo: Option<PathBuf>,
    /// Overview map of all alerts.
    pub alerts_map: Option<PathBuf>,
    /// Directory holding the per-cluster maps (`cluster_{id}_map.png`).
    pub maps_dir: Option<PathBuf>,
    /// Start of the imagery search window. Defaults to the earliest
    /// clustered alert date.
    pub imagery_start: Option<NaiveDate>,
    /// End of the imagery search window. Defaults to the latest
    /// clustered alert date.
    pub imagery_end: Option<NaiveDate>,
    /// Days the fallback window reaches back before the start.
    pub fallback_days: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            quarter: None,
            year: None,
            logo: None,
            alerts_map: None,
            maps_dir: None,
            imagery_start: None,
            imagery_end: None,
            fallback_days: DEFAULT_FALLBACK_DAYS,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Toml`] on malformed TOML and
    /// [`PipelineError::InvalidConfig`] if validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read, otherwise
    /// see [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded configuration '{}' from {}", config.name, path.display());
        Ok(config)
    }

    /// Replaces the radii where an override is given, then revalidates.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if an override is not a
    /// positive finite number.
    pub fn with_radii(
        mut self,
        buffer_radius_m: Option<f64>,
        bbox_buffer_m: Option<f64>,
    ) -> Result<Self, PipelineError> {
        if let Some(radius) = buffer_radius_m {
            self.cluster.buffer_radius_m = radius;
        }
        if let Some(radius) = bbox_buffer_m {
            self.cluster.bbox_buffer_m = radius;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks the radii and the imagery window.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// problem found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_radius("cluster.buffer_radius_m", self.cluster.buffer_radius_m)?;
        check_radius("cluster.bbox_buffer_m", self.cluster.bbox_buffer_m)?;

        if let (Some(start), Some(end)) = (self.report.imagery_start, self.report.imagery_end) {
            if start > end {
                return Err(PipelineError::InvalidConfig {
                    message: format!(
                        "report.imagery_start {start} is after report.imagery_end {end}"
                    ),
                });
            }
        }

        Ok(())
    }
}

fn check_radius(field: &str, value: f64) -> Result<(), PipelineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidConfig {
            message: format!("{field} must be a positive number of meters, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        name = "test"

        [cluster]
        buffer_radius_m = 250.0
        bbox_buffer_m = 900.0
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = PipelineConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.schema, SectionSchema::default());
        assert_eq!(config.report.fallback_days, DEFAULT_FALLBACK_DAYS);
        assert!(config.report.quarter.is_none());
    }

    #[test]
    fn report_section_parses() {
        let text = format!(
            "{MINIMAL}\n[report]\nquarter = \"I\"\nyear = 2025\nimagery_start = \"2025-01-01\"\nimagery_end = \"2025-03-31\"\nfallback_days = 60\n"
        );
        let config = PipelineConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.report.quarter.as_deref(), Some("I"));
        assert_eq!(config.report.year, Some(2025));
        assert_eq!(config.report.imagery_start, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(config.report.fallback_days, 60);
    }

    #[test]
    fn rejects_non_positive_radius() {
        let err = PipelineConfig::from_toml_str(&MINIMAL.replace("250.0", "0.0")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { .. }));
        assert!(err.to_string().contains("buffer_radius_m"));
    }

    #[test]
    fn overrides_are_validated() {
        let config = PipelineConfig::from_toml_str(MINIMAL).unwrap();
        let config = config.with_radii(Some(1000.0), None).unwrap();
        assert!((config.cluster.buffer_radius_m - 1000.0).abs() < f64::EPSILON);
        assert!((config.cluster.bbox_buffer_m - 900.0).abs() < f64::EPSILON);

        let err = config.with_radii(None, Some(f64::NAN)).unwrap_err();
        assert!(err.to_string().contains("bbox_buffer_m"));
    }

    #[test]
    fn inverted_imagery_window_is_rejected() {
        let text = format!(
            "{MINIMAL}\n[report]\nimagery_start = \"2025-04-01\"\nimagery_end = \"2025-03-31\"\n"
        );
        let err = PipelineConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { .. }));
    }

    #[test]
    fn malformed_toml_is_a_toml_error() {
        let err = PipelineConfig::from_toml_str("name = ").unwrap_err();
        assert!(matches!(err, PipelineError::Toml(_)));
    }
}
