#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Alert enrichment and clustering pipeline.
//!
//! A run loads the alert table and the two boundary layers, summarizes
//! confidence labels over every alert, keeps the `highest` alerts, joins
//! them against veredas and rural sections, clusters them within each
//! section, and derives per-cluster bounding boxes, summaries, imagery
//! requests and the report document.
//!
//! [`process`] does the in-memory work; [`run`] adds loading and writing.

pub mod aggregate;
pub mod cluster;
pub mod config;
pub mod enrich;
pub mod imagery;
pub mod output;
pub mod profiles;
pub mod progress;
pub mod report;
pub mod summary;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gfw_alerts_alert_models::{AdminAttributes, ClusteredAlert, SectionRecord};
use gfw_alerts_ingest::{
    AlertLayer, LoadError, StudyArea, load_admin_boundaries, load_alerts, load_section_panel,
    load_study_area,
};
use gfw_alerts_spatial::{BoundaryIndex, BoundaryLayer, Crs};
use thiserror::Error;

use crate::aggregate::{ClusterBoundingBox, ClusterSummary};
use crate::config::PipelineConfig;
use crate::enrich::JoinStats;
use crate::imagery::{ImageryRequest, ImageryWindow};
use crate::progress::ProgressCallback;
use crate::report::Report;
use crate::summary::ConfidenceSummary;

/// Errors that can occur during a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input layer could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration file is not valid TOML for [`PipelineConfig`].
    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration is well-formed but unusable.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },

    /// Two layers are in different coordinate reference systems.
    #[error("CRS mismatch: {layer} is in {found}, alerts are in {expected}")]
    CrsMismatch {
        /// Layer that disagrees.
        layer: String,
        /// CRS of the alerts.
        expected: Crs,
        /// CRS of `layer`.
        found: Crs,
    },
}

/// Input files of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInputs {
    /// Alert table (`.csv`, `.geojson` or `.json`).
    pub alerts: PathBuf,
    /// Vereda boundaries.
    pub veredas: PathBuf,
    /// Rural-section panel.
    pub sections: PathBuf,
    /// Optional study area whose bounding box is written out.
    pub study_area: Option<PathBuf>,
    /// Directory the outputs are written to.
    pub output_dir: PathBuf,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Label counts over every input alert.
    pub summary: ConfidenceSummary,
    /// Vereda join statistics.
    pub admin_stats: JoinStats,
    /// Section join statistics.
    pub section_stats: JoinStats,
    /// `highest` alerts with their enrichment and cluster id.
    pub clustered: Vec<ClusteredAlert>,
    /// One box per cluster, by id.
    pub bounding_boxes: Vec<ClusterBoundingBox>,
    /// One representative row per cluster, by id.
    pub clusters: Vec<ClusterSummary>,
    /// One request per box; empty when no imagery window is known.
    pub imagery: Vec<ImageryRequest>,
    /// The report document.
    pub report: Report,
}

fn ensure_same_crs(layer: &str, expected: Crs, found: Crs) -> Result<(), PipelineError> {
    if expected == found {
        Ok(())
    } else {
        Err(PipelineError::CrsMismatch {
            layer: layer.to_string(),
            expected,
            found,
        })
    }
}

/// Runs every in-memory stage.
///
/// `report_path` only affects how asset paths in the report are
/// relativized.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an invalid configuration
/// and [`PipelineError::CrsMismatch`] if a boundary layer's CRS differs
/// from the alerts'.
pub fn process(
    alerts: &AlertLayer,
    veredas: BoundaryLayer<AdminAttributes>,
    sections: BoundaryLayer<SectionRecord>,
    config: &PipelineConfig,
    report_path: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    ensure_same_crs("vereda layer", alerts.crs, veredas.crs)?;
    ensure_same_crs("section panel", alerts.crs, sections.crs)?;

    let summary = summary::summarize_confidence(&alerts.alerts);

    let veredas = BoundaryIndex::new(veredas);
    let sections = enrich::section_index(sections);
    let enrichment = enrich::enrich_alerts(&alerts.alerts, &veredas, &sections, progress);

    let clustered = cluster::cluster_alerts(
        enrichment.alerts,
        config.cluster.buffer_radius_m,
        progress,
    );
    let bounding_boxes = aggregate::cluster_bounding_boxes(&clustered, config.cluster.bbox_buffer_m);
    let clusters = aggregate::summarize_clusters(&clustered);

    let imagery = match ImageryWindow::resolve(&config.report, &clusters) {
        Some(window) => imagery::plan_imagery(&bounding_boxes, window),
        None => {
            if !clusters.is_empty() {
                log::warn!("No imagery window configured and no alert dates; skipping imagery plan");
            }
            Vec::new()
        }
    };

    let report = report::build_report(&summary, &clusters, &config.report, report_path);

    Ok(PipelineOutput {
        summary,
        admin_stats: enrichment.admin_stats,
        section_stats: enrichment.section_stats,
        clustered,
        bounding_boxes,
        clusters,
        imagery,
        report,
    })
}

/// Writes every output of a run into `output_dir`.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] or [`PipelineError::Json`] if a file
/// cannot be written.
pub fn write_outputs(
    output: &PipelineOutput,
    config: &PipelineConfig,
    output_dir: &Path,
) -> Result<(), PipelineError> {
    std::fs::create_dir_all(output_dir)?;
    output::write_feature_collection(
        &output_dir.join(output::CLUSTERED_ALERTS_FILE),
        &output::clustered_alerts_collection(&output.clustered, &config.schema),
    )?;
    output::write_feature_collection(
        &output_dir.join(output::BOUNDING_BOXES_FILE),
        &output::bounding_boxes_collection(&output.bounding_boxes),
    )?;
    output::write_json(&output_dir.join(output::SUMMARY_FILE), &output.summary)?;
    output::write_json(&output_dir.join(output::IMAGERY_FILE), &output.imagery)?;
    output::write_json(&output_dir.join(output::REPORT_FILE), &output.report)?;
    Ok(())
}

/// Writes the study area's bounding box into `output_dir`.
///
/// # Errors
///
/// See [`write_outputs`].
pub fn write_study_area(area: &StudyArea, output_dir: &Path) -> Result<(), PipelineError> {
    output::write_feature_collection(
        &output_dir.join(output::STUDY_AREA_BBOX_FILE),
        &output::study_area_bbox_collection(area),
    )
}

/// Loads the inputs, processes them and writes every output.
///
/// # Errors
///
/// Returns [`PipelineError`] if any input fails to load, the
/// configuration is invalid, or an output cannot be written.
pub fn run(
    inputs: &PipelineInputs,
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    log::info!(
        "Running profile '{}' (buffer {} m, bbox buffer {} m)",
        config.name,
        config.cluster.buffer_radius_m,
        config.cluster.bbox_buffer_m
    );

    let alerts = load_alerts(&inputs.alerts)?;
    let veredas = load_admin_boundaries(&inputs.veredas)?;
    let sections = load_section_panel(&inputs.sections, &config.schema)?;

    let report_path = inputs.output_dir.join(output::REPORT_FILE);
    let output = process(&alerts, veredas, sections, config, &report_path, progress)?;

    write_outputs(&output, config, &inputs.output_dir)?;

    if let Some(path) = &inputs.study_area {
        let area = load_study_area(path)?;
        write_study_area(&area, &inputs.output_dir)?;
    }

    log::info!(
        "Done: {} alerts in {} clusters, outputs in {}",
        output.clustered.len(),
        output.clusters.len(),
        inputs.output_dir.display()
    );
    Ok(output)
}
