//! Column names of the rural-section panel.
//!
//! Panel vintages disagree on some indicator names (e.g. `pobdens20` vs
//! `popcount20`), so the names are configuration. The census utility
//! columns (`STP19_*`) are stable and fixed in
//! [`UtilityCounts::COLUMNS`](gfw_alerts_alert_models::UtilityCounts::COLUMNS).

use gfw_alerts_alert_models::UtilityCounts;
use serde::{Deserialize, Serialize};

/// Names of the panel columns read into a
/// [`SectionRecord`](gfw_alerts_alert_models::SectionRecord).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSchema {
    /// Municipality code column.
    pub municipality_code: String,
    /// Section code column (clustering key).
    pub section_code: String,
    /// Housing unit count column (percentage base).
    pub housing_units: String,
    /// Resident persons column.
    pub persons: String,
    /// Population density indicator column.
    pub population_density: String,
    /// GDP per square meter indicator column.
    pub gdp_per_m2: String,
    /// Market access indicator column.
    pub market_access: String,
    /// Elevation indicator column.
    pub elevation: String,
    /// Deprivation index column.
    pub deprivation: String,
    /// Tree cover indicator column.
    pub tree_cover: String,
}

impl Default for SectionSchema {
    fn default() -> Self {
        Self {
            municipality_code: "MPIO_CDPMP".to_string(),
            section_code: "SECR_CCNCT".to_string(),
            housing_units: "STVIVIENDA".to_string(),
            persons: "STP27_PERS".to_string(),
            population_density: "pobdens20".to_string(),
            gdp_per_m2: "gdp_20_m2p".to_string(),
            market_access: "acss_mrkt".to_string(),
            elevation: "elevation".to_string(),
            deprivation: "dprivt".to_string(),
            tree_cover: "treecv_24".to_string(),
        }
    }
}

impl SectionSchema {
    /// Indicator column names in
    /// [`SectionIndicators`](gfw_alerts_alert_models::SectionIndicators)
    /// field order.
    #[must_use]
    pub fn indicator_columns(&self) -> [&str; 6] {
        [
            &self.population_density,
            &self.gdp_per_m2,
            &self.market_access,
            &self.elevation,
            &self.deprivation,
            &self.tree_cover,
        ]
    }

    /// Every column the panel must carry.
    #[must_use]
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns = vec![
            self.municipality_code.as_str(),
            self.section_code.as_str(),
            self.housing_units.as_str(),
        ];
        columns.extend(UtilityCounts::COLUMNS);
        columns.push(&self.persons);
        columns.extend(self.indicator_columns());
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_requires_panel_columns() {
        let schema = SectionSchema::default();
        let required = schema.required_columns();
        assert_eq!(required.len(), 22);
        assert!(required.contains(&"SECR_CCNCT"));
        assert!(required.contains(&"STP19_INT2"));
        assert!(required.contains(&"pobdens20"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let schema: SectionSchema = from_json(r#"{"population_density": "popcount20"}"#);
        assert_eq!(schema.population_density, "popcount20");
        assert_eq!(schema.section_code, "SECR_CCNCT");
    }

    fn from_json(json: &str) -> SectionSchema {
        serde_json::from_str(json).unwrap()
    }
}
