//! Confidence filtering and the two point-in-polygon joins.
//!
//! Only alerts whose integrated confidence is exactly `highest` are kept.
//! Each survivor is joined against the vereda layer, then against the
//! rural-section layer whose utility counts have already been turned into
//! percentages of the section's housing units. Both joins are left joins:
//! an alert outside every polygon keeps `None` for that layer.

use std::sync::Arc;

use gfw_alerts_alert_models::{
    AdminAttributes, Alert, EnrichedAlert, SectionAttributes, SectionRecord, UtilityPercentages,
};
use gfw_alerts_spatial::{Boundary, BoundaryIndex, BoundaryLayer, BoundaryMatch};

use crate::progress::{ProgressCallback, units};

/// Outcome counts of one spatial join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Alerts inside at least one polygon.
    pub matched: usize,
    /// Alerts inside no polygon.
    pub unmatched: usize,
    /// Matched alerts that more than one polygon contained.
    pub ambiguous: usize,
}

impl JoinStats {
    fn record<T>(&mut self, layer: &str, alert: &Alert, hit: Option<&BoundaryMatch<'_, T>>) {
        match hit {
            None => self.unmatched += 1,
            Some(hit) => {
                self.matched += 1;
                if hit.is_ambiguous() {
                    self.ambiguous += 1;
                    log::warn!(
                        "Alert at ({}, {}) falls in {} {layer} polygons; using feature {}",
                        alert.longitude,
                        alert.latitude,
                        hit.containing,
                        hit.position
                    );
                }
            }
        }
    }
}

/// Enriched alerts plus the statistics of both joins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    /// One entry per `highest` alert, in input order.
    pub alerts: Vec<EnrichedAlert>,
    /// Vereda join statistics.
    pub admin_stats: JoinStats,
    /// Rural-section join statistics.
    pub section_stats: JoinStats,
}

/// Keeps the alerts whose integrated confidence is exactly `highest`.
///
/// Logs a warning when none pass.
#[must_use]
pub fn filter_highest(alerts: &[Alert]) -> Vec<Alert> {
    let kept: Vec<Alert> = alerts.iter().filter(|a| a.is_highest()).cloned().collect();
    if kept.is_empty() {
        log::warn!(
            "No alerts with 'highest' confidence among {} alerts; nothing to cluster",
            alerts.len()
        );
    } else {
        log::info!(
            "{} of {} alerts have 'highest' confidence",
            kept.len(),
            alerts.len()
        );
    }
    kept
}

/// `count / housing_units * 100`, or `None` when either is missing or the
/// housing base is zero.
#[must_use]
pub fn percentage(count: Option<f64>, housing_units: Option<f64>) -> Option<f64> {
    let base = housing_units.filter(|b| *b != 0.0)?;
    Some(count? / base * 100.0)
}

/// Derives the six utility-access percentages of a section.
#[must_use]
pub fn utility_percentages(record: &SectionRecord) -> UtilityPercentages {
    let u = &record.utilities;
    let base = record.housing_units;
    UtilityPercentages {
        energy: percentage(u.ec_1, base),
        aqueduct: percentage(u.acu_1, base),
        sewerage: percentage(u.alc_1, base),
        gas: percentage(u.gas_1, base),
        garbage: percentage(u.rec_1, base),
        internet: percentage(u.int_1, base),
    }
}

/// Computes percentages for every section and indexes the layer.
#[must_use]
pub fn section_index(layer: BoundaryLayer<SectionRecord>) -> BoundaryIndex<SectionAttributes> {
    let BoundaryLayer { crs, boundaries } = layer;
    let boundaries = boundaries
        .into_iter()
        .map(|b| Boundary {
            polygon: b.polygon,
            attributes: SectionAttributes {
                percentages: utility_percentages(&b.attributes),
                record: b.attributes,
            },
        })
        .collect();
    BoundaryIndex::new(BoundaryLayer { crs, boundaries })
}

/// Filters `alerts` to `highest` and joins the survivors against both
/// layers.
#[must_use]
pub fn enrich_alerts(
    alerts: &[Alert],
    veredas: &BoundaryIndex<AdminAttributes>,
    sections: &BoundaryIndex<SectionAttributes>,
    progress: &Arc<dyn ProgressCallback>,
) -> Enrichment {
    let highest = filter_highest(alerts);

    let mut admin_stats = JoinStats::default();
    let mut section_stats = JoinStats::default();

    progress.start("Joining alerts", units(highest.len()));

    let enriched: Vec<EnrichedAlert> = highest
        .into_iter()
        .map(|alert| {
            let admin_hit = veredas.lookup(alert.longitude, alert.latitude);
            admin_stats.record("vereda", &alert, admin_hit.as_ref());

            let section_hit = sections.lookup(alert.longitude, alert.latitude);
            section_stats.record("section", &alert, section_hit.as_ref());

            let admin = admin_hit.map(|hit| hit.attributes.clone());
            let section = section_hit.map(|hit| hit.attributes.clone());
            progress.inc(1);

            EnrichedAlert {
                alert,
                admin,
                section,
            }
        })
        .collect();

    progress.finish(&format!("Joined {} alerts", enriched.len()));
    log::info!(
        "Vereda join: {} matched, {} unmatched, {} ambiguous",
        admin_stats.matched,
        admin_stats.unmatched,
        admin_stats.ambiguous
    );
    log::info!(
        "Section join: {} matched, {} unmatched, {} ambiguous",
        section_stats.matched,
        section_stats.unmatched,
        section_stats.ambiguous
    );

    Enrichment {
        alerts: enriched,
        admin_stats,
        section_stats,
    }
}
