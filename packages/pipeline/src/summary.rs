//! Counts of confidence labels per alert source.
//!
//! Runs on the full alert table, before the `highest` filter.

use std::collections::BTreeMap;

use gfw_alerts_alert_models::{Alert, AlertSource};

/// Key holding the sum of all label counts of a column.
pub const TOTAL_KEY: &str = "total";

/// Column name → label (or [`TOTAL_KEY`]) → count.
pub type ConfidenceSummary = BTreeMap<String, BTreeMap<String, u64>>;

/// Tabulates every confidence column. Missing labels are not counted;
/// every column is present even if it has no labels at all.
#[must_use]
pub fn summarize_confidence(alerts: &[Alert]) -> ConfidenceSummary {
    AlertSource::all()
        .iter()
        .map(|&source| {
            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for level in alerts.iter().filter_map(|a| a.confidences.get(source)) {
                *counts.entry(level.to_string()).or_default() += 1;
            }
            let total = counts.values().sum();
            counts.insert(TOTAL_KEY.to_string(), total);
            (source.confidence_column().to_string(), counts)
        })
        .collect()
}

/// Count of `label` in `column`, 0 when absent.
#[must_use]
pub fn count(summary: &ConfidenceSummary, column: &str, label: &str) -> u64 {
    summary
        .get(column)
        .and_then(|counts| counts.get(label))
        .copied()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use gfw_alerts_alert_models::{AlertConfidences, ConfidenceLevel};

    use super::*;

    fn alert(gfw: Option<ConfidenceLevel>, radd: Option<ConfidenceLevel>) -> Alert {
        Alert {
            longitude: 0.0,
            latitude: 0.0,
            alert_date: None,
            confidences: AlertConfidences {
                gfw_integrated: gfw,
                wur_radd: radd,
                ..AlertConfidences::default()
            },
        }
    }

    fn sample() -> Vec<Alert> {
        use ConfidenceLevel::{High, Highest, Nominal, NotDetected};
        vec![
            alert(Some(Highest), Some(NotDetected)),
            alert(Some(Highest), None),
            alert(Some(Highest), Some(High)),
            alert(Some(High), None),
            alert(Some(High), None),
            alert(Some(Nominal), None),
        ]
    }

    #[test]
    fn totals_sum_label_counts() {
        let summary = summarize_confidence(&sample());
        let gfw = &summary["gfw_integrated_alerts__confidence"];
        assert_eq!(gfw["highest"], 3);
        assert_eq!(gfw["high"], 2);
        assert_eq!(gfw["nominal"], 1);
        assert_eq!(gfw[TOTAL_KEY], 6);
    }

    #[test]
    fn missing_labels_are_not_counted() {
        let summary = summarize_confidence(&sample());
        let radd = &summary["wur_radd_alerts__confidence"];
        assert_eq!(radd["not_detected"], 1);
        assert_eq!(radd[TOTAL_KEY], 2);

        let landsat = &summary["umd_glad_landsat_alerts__confidence"];
        assert_eq!(landsat.len(), 1);
        assert_eq!(landsat[TOTAL_KEY], 0);
    }

    #[test]
    fn summary_is_idempotent() {
        let alerts = sample();
        assert_eq!(summarize_confidence(&alerts), summarize_confidence(&alerts));
    }

    #[test]
    fn absent_counts_default_to_zero() {
        let summary = summarize_confidence(&sample());
        assert_eq!(count(&summary, "gfw_integrated_alerts__confidence", "not_detected"), 0);
        assert_eq!(count(&summary, "no_such_column", "high"), 0);
        assert_eq!(count(&summary, "gfw_integrated_alerts__confidence", "highest"), 3);
    }
}
