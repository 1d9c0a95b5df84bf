//! The consolidated report document read by the HTML templater.
//!
//! Key names are the templater's and stay in Spanish.

use std::path::{Component, Path, PathBuf};

use gfw_alerts_alert_models::{AlertSource, ClusterId};
use serde::Serialize;

use crate::aggregate::ClusterSummary;
use crate::config::ReportConfig;
use crate::summary::{ConfidenceSummary, TOTAL_KEY, count};

/// The report document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(rename = "TRIMESTRE")]
    pub quarter: Option<String>,
    #[serde(rename = "ANIO")]
    pub year: Option<i32>,
    #[serde(rename = "LOGO")]
    pub logo: Option<String>,
    #[serde(rename = "MAPA_ALERTAS")]
    pub alerts_map: Option<String>,

    #[serde(rename = "GFW_NOMINAL")]
    pub gfw_nominal: u64,
    #[serde(rename = "GFW_ALTO")]
    pub gfw_high: u64,
    #[serde(rename = "GFW_MUY_ALTO")]
    pub gfw_highest: u64,
    #[serde(rename = "GFW_TOTAL")]
    pub gfw_total: u64,

    #[serde(rename = "GLADL_NOMINAL")]
    pub glad_landsat_nominal: u64,
    #[serde(rename = "GLADL_ALTO")]
    pub glad_landsat_high: u64,
    #[serde(rename = "GLADL_NO_DET")]
    pub glad_landsat_not_detected: u64,
    #[serde(rename = "GLADL_TOTAL")]
    pub glad_landsat_total: u64,

    #[serde(rename = "GLADS_NOMINAL")]
    pub glad_sentinel2_nominal: u64,
    #[serde(rename = "GLADS_ALTO")]
    pub glad_sentinel2_high: u64,
    #[serde(rename = "GLADS_NO_DET")]
    pub glad_sentinel2_not_detected: u64,
    #[serde(rename = "GLADS_TOTAL")]
    pub glad_sentinel2_total: u64,

    #[serde(rename = "RADD_NOMINAL")]
    pub radd_nominal: u64,
    #[serde(rename = "RADD_ALTO")]
    pub radd_high: u64,
    #[serde(rename = "RADD_NO_DET")]
    pub radd_not_detected: u64,
    #[serde(rename = "RADD_TOTAL")]
    pub radd_total: u64,

    /// One entry per `highest` cluster.
    #[serde(rename = "SECCIONES_MUY_ALTO")]
    pub clusters: Vec<ClusterEntry>,
}

/// Report entry of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterEntry {
    pub cluster_id: ClusterId,
    #[serde(rename = "municipio")]
    pub municipality: String,
    pub vereda: String,
    #[serde(rename = "densidad_poblacional")]
    pub population_density: Option<f64>,
    #[serde(rename = "pib_m2")]
    pub gdp_per_m2: Option<f64>,
    #[serde(rename = "mercado_acceso")]
    pub market_access: Option<f64>,
    #[serde(rename = "elevacion")]
    pub elevation: Option<f64>,
    #[serde(rename = "ind_priv")]
    pub deprivation: Option<f64>,
    #[serde(rename = "cobertura_arboles")]
    pub tree_cover: Option<f64>,
    #[serde(rename = "energia_pct")]
    pub energy_pct: Option<f64>,
    #[serde(rename = "acueducto_pct")]
    pub aqueduct_pct: Option<f64>,
    #[serde(rename = "alcantarillado_pct")]
    pub sewerage_pct: Option<f64>,
    pub gas_pct: Option<f64>,
    #[serde(rename = "basura_pct")]
    pub garbage_pct: Option<f64>,
    pub internet_pct: Option<f64>,
    #[serde(rename = "mapa_cluster")]
    pub cluster_map: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Notes from the imagery downloader, e.g. a widened search window.
    #[serde(rename = "OBSERVACION_IMAGEN")]
    pub image_notes: Vec<String>,
}

/// File name of a cluster's map inside the maps directory.
#[must_use]
pub fn cluster_map_file_name(cluster_id: ClusterId) -> String {
    format!("cluster_{cluster_id}_map.png")
}

/// Assembles the report. `report_path` is where it will be written;
/// absolute asset paths are made relative to its directory.
#[must_use]
pub fn build_report(
    summary: &ConfidenceSummary,
    clusters: &[ClusterSummary],
    config: &ReportConfig,
    report_path: &Path,
) -> Report {
    let base = report_path.parent().unwrap_or_else(|| Path::new(""));
    let rel = |path: &Path| relative_to(path, base).to_string_lossy().into_owned();

    let column = |source: AlertSource| source.confidence_column();
    let gfw = column(AlertSource::GfwIntegrated);
    let landsat = column(AlertSource::GladLandsat);
    let sentinel = column(AlertSource::GladSentinel2);
    let radd = column(AlertSource::WurRadd);

    let entries = clusters
        .iter()
        .map(|cluster| {
            let admin = cluster.admin.as_ref();
            let section = cluster.section.as_ref();
            let indicators = section.map(|s| s.record.indicators).unwrap_or_default();
            let pct = section.map(|s| s.percentages).unwrap_or_default();

            ClusterEntry {
                cluster_id: cluster.cluster_id,
                municipality: admin
                    .and_then(|a| a.municipality.clone())
                    .unwrap_or_default(),
                vereda: admin.and_then(|a| a.vereda.clone()).unwrap_or_default(),
                population_density: indicators.population_density,
                gdp_per_m2: indicators.gdp_per_m2,
                market_access: indicators.market_access,
                elevation: indicators.elevation,
                deprivation: indicators.deprivation,
                tree_cover: indicators.tree_cover,
                energy_pct: pct.energy,
                aqueduct_pct: pct.aqueduct,
                sewerage_pct: pct.sewerage,
                gas_pct: pct.gas,
                garbage_pct: pct.garbage,
                internet_pct: pct.internet,
                cluster_map: config
                    .maps_dir
                    .as_ref()
                    .map(|dir| rel(&dir.join(cluster_map_file_name(cluster.cluster_id)))),
                lat: cluster.centroid.y(),
                lon: cluster.centroid.x(),
                image_notes: Vec::new(),
            }
        })
        .collect();

    Report {
        quarter: config.quarter.clone(),
        year: config.year,
        logo: config.logo.as_deref().map(rel),
        alerts_map: config.alerts_map.as_deref().map(rel),

        gfw_nominal: count(summary, gfw, "nominal"),
        gfw_high: count(summary, gfw, "high"),
        gfw_highest: count(summary, gfw, "highest"),
        gfw_total: count(summary, gfw, TOTAL_KEY),

        glad_landsat_nominal: count(summary, landsat, "nominal"),
        glad_landsat_high: count(summary, landsat, "high"),
        glad_landsat_not_detected: count(summary, landsat, "not_detected"),
        glad_landsat_total: count(summary, landsat, TOTAL_KEY),

        glad_sentinel2_nominal: count(summary, sentinel, "nominal"),
        glad_sentinel2_high: count(summary, sentinel, "high"),
        glad_sentinel2_not_detected: count(summary, sentinel, "not_detected"),
        glad_sentinel2_total: count(summary, sentinel, TOTAL_KEY),

        radd_nominal: count(summary, radd, "nominal"),
        radd_high: count(summary, radd, "high"),
        radd_not_detected: count(summary, radd, "not_detected"),
        radd_total: count(summary, radd, TOTAL_KEY),

        clusters: entries,
    }
}

/// `path` relative to `base` when both are absolute; otherwise `path`
/// unchanged.
#[must_use]
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if !path.is_absolute() {
        return path.to_path_buf();
    }
    let Ok(base) = std::path::absolute(base) else {
        return path.to_path_buf();
    };

    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return path.to_path_buf();
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }
    relative
}
