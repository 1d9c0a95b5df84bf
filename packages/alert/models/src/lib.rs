#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deforestation alert types shared across the gfw-alerts toolchain.
//!
//! Defines the raw [`Alert`] as downloaded from the Global Forest Watch
//! integrated alerts dataset, the attribute records carried by the two
//! boundary layers (veredas and rural census sections), and the enriched
//! and clustered alert rows produced by the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Column holding the integrated alert date.
pub const ALERT_DATE_COLUMN: &str = "gfw_integrated_alerts__date";

/// Longitude column of the alert table.
pub const LONGITUDE_COLUMN: &str = "longitude";

/// Latitude column of the alert table.
pub const LATITUDE_COLUMN: &str = "latitude";

/// Detection strength reported by an alert subsystem.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfidenceLevel {
    /// Confirmed by multiple systems (`"highest"`).
    Highest,
    /// `"high"`
    High,
    /// `"nominal"`
    Nominal,
    /// The subsystem did not detect this event (`"not_detected"`).
    NotDetected,
}

/// The four alert subsystems whose confidence is reported per alert.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertSource {
    /// GFW integrated alerts (the filter column).
    GfwIntegrated,
    /// UMD GLAD Landsat alerts.
    GladLandsat,
    /// UMD GLAD Sentinel-2 alerts.
    GladSentinel2,
    /// WUR RADD radar alerts.
    WurRadd,
}

impl AlertSource {
    /// Returns all variants of this enum, in column order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::GfwIntegrated,
            Self::GladLandsat,
            Self::GladSentinel2,
            Self::WurRadd,
        ]
    }

    /// Name of the confidence column for this source in the alert table.
    #[must_use]
    pub const fn confidence_column(self) -> &'static str {
        match self {
            Self::GfwIntegrated => "gfw_integrated_alerts__confidence",
            Self::GladLandsat => "umd_glad_landsat_alerts__confidence",
            Self::GladSentinel2 => "umd_glad_sentinel2_alerts__confidence",
            Self::WurRadd => "wur_radd_alerts__confidence",
        }
    }
}

/// Confidence labels of one alert, one per [`AlertSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfidences {
    /// `gfw_integrated_alerts__confidence`
    pub gfw_integrated: Option<ConfidenceLevel>,
    /// `umd_glad_landsat_alerts__confidence`
    pub glad_landsat: Option<ConfidenceLevel>,
    /// `umd_glad_sentinel2_alerts__confidence`
    pub glad_sentinel2: Option<ConfidenceLevel>,
    /// `wur_radd_alerts__confidence`
    pub wur_radd: Option<ConfidenceLevel>,
}

impl AlertConfidences {
    /// Returns the label reported by `source`.
    #[must_use]
    pub const fn get(&self, source: AlertSource) -> Option<ConfidenceLevel> {
        match source {
            AlertSource::GfwIntegrated => self.gfw_integrated,
            AlertSource::GladLandsat => self.glad_landsat,
            AlertSource::GladSentinel2 => self.glad_sentinel2,
            AlertSource::WurRadd => self.wur_radd,
        }
    }

    /// Sets the label reported by `source`.
    pub const fn set(&mut self, source: AlertSource, level: Option<ConfidenceLevel>) {
        match source {
            AlertSource::GfwIntegrated => self.gfw_integrated = level,
            AlertSource::GladLandsat => self.glad_landsat = level,
            AlertSource::GladSentinel2 => self.glad_sentinel2 = level,
            AlertSource::WurRadd => self.wur_radd = level,
        }
    }
}

/// A single deforestation alert point in WGS84.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Integrated alert date, if reported.
    pub alert_date: Option<NaiveDate>,
    /// Per-subsystem confidence labels.
    pub confidences: AlertConfidences,
}

impl Alert {
    /// Whether the integrated alert confidence is exactly `"highest"`.
    #[must_use]
    pub fn is_highest(&self) -> bool {
        self.confidences.gfw_integrated == Some(ConfidenceLevel::Highest)
    }
}

/// Attributes of a vereda polygon from the administrative boundary layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAttributes {
    /// `CODIGO_VER`
    #[serde(rename = "CODIGO_VER")]
    pub vereda_code: Option<String>,
    /// `NOMB_MPIO`
    #[serde(rename = "NOMB_MPIO")]
    pub municipality: Option<String>,
    /// `NOMBRE_VER`
    #[serde(rename = "NOMBRE_VER")]
    pub vereda: Option<String>,
}

/// Raw census utility-access counts of a rural section (`STP19_*`).
///
/// Field names follow the census variable codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilityCounts {
    #[serde(rename = "STP19_EC_1")]
    pub ec_1: Option<f64>,
    #[serde(rename = "STP19_ES_2")]
    pub es_2: Option<f64>,
    #[serde(rename = "STP19_ACU1")]
    pub acu_1: Option<f64>,
    #[serde(rename = "STP19_ACU2")]
    pub acu_2: Option<f64>,
    #[serde(rename = "STP19_ALC1")]
    pub alc_1: Option<f64>,
    #[serde(rename = "STP19_ALC2")]
    pub alc_2: Option<f64>,
    #[serde(rename = "STP19_GAS1")]
    pub gas_1: Option<f64>,
    #[serde(rename = "STP19_GAS2")]
    pub gas_2: Option<f64>,
    #[serde(rename = "STP19_REC1")]
    pub rec_1: Option<f64>,
    #[serde(rename = "STP19_REC2")]
    pub rec_2: Option<f64>,
    #[serde(rename = "STP19_INT1")]
    pub int_1: Option<f64>,
    #[serde(rename = "STP19_INT2")]
    pub int_2: Option<f64>,
}

impl UtilityCounts {
    /// Census column names in field order.
    pub const COLUMNS: [&'static str; 12] = [
        "STP19_EC_1",
        "STP19_ES_2",
        "STP19_ACU1",
        "STP19_ACU2",
        "STP19_ALC1",
        "STP19_ALC2",
        "STP19_GAS1",
        "STP19_GAS2",
        "STP19_REC1",
        "STP19_REC2",
        "STP19_INT1",
        "STP19_INT2",
    ];

    /// Values in [`Self::COLUMNS`] order.
    #[must_use]
    pub const fn values(&self) -> [Option<f64>; 12] {
        [
            self.ec_1, self.es_2, self.acu_1, self.acu_2, self.alc_1, self.alc_2, self.gas_1,
            self.gas_2, self.rec_1, self.rec_2, self.int_1, self.int_2,
        ]
    }

    /// Builds counts from values in [`Self::COLUMNS`] order.
    #[must_use]
    pub const fn from_values(values: [Option<f64>; 12]) -> Self {
        let [
            ec_1,
            es_2,
            acu_1,
            acu_2,
            alc_1,
            alc_2,
            gas_1,
            gas_2,
            rec_1,
            rec_2,
            int_1,
            int_2,
        ] = values;
        Self {
            ec_1,
            es_2,
            acu_1,
            acu_2,
            alc_1,
            alc_2,
            gas_1,
            gas_2,
            rec_1,
            rec_2,
            int_1,
            int_2,
        }
    }
}

/// Socioeconomic indicators attached to each rural section.
///
/// The source column names vary between panel vintages, so they are
/// resolved through the configured schema rather than fixed here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionIndicators {
    /// Population density (`pobdens20` in the 2020 panel).
    pub population_density: Option<f64>,
    /// GDP per square meter (`gdp_20_m2p`).
    pub gdp_per_m2: Option<f64>,
    /// Travel time to the nearest market (`acss_mrkt`).
    pub market_access: Option<f64>,
    /// Mean elevation (`elevation`).
    pub elevation: Option<f64>,
    /// Deprivation index (`dprivt`).
    pub deprivation: Option<f64>,
    /// Tree cover percentage (`treecv_24`).
    pub tree_cover: Option<f64>,
}

/// A rural section row as read from the panel layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// `MPIO_CDPMP`, kept as a string so leading zeros survive.
    pub municipality_code: Option<String>,
    /// `SECR_CCNCT`, the clustering key.
    pub section_code: Option<String>,
    /// `STVIVIENDA`, housing units in the section.
    pub housing_units: Option<f64>,
    /// Raw utility-access counts.
    pub utilities: UtilityCounts,
    /// `STP27_PERS`, resident persons.
    pub persons: Option<f64>,
    /// Socioeconomic indicators.
    pub indicators: SectionIndicators,
}

/// Share of housing units with access to each utility, in percent.
///
/// `None` means the share could not be derived (missing count or a
/// zero/missing housing base), never 0%.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilityPercentages {
    /// `ENRG_PERC`, electricity.
    #[serde(rename = "ENRG_PERC")]
    pub energy: Option<f64>,
    /// `ACUED_PERC`, aqueduct.
    #[serde(rename = "ACUED_PERC")]
    pub aqueduct: Option<f64>,
    /// `ALCLT_PERC`, sewerage.
    #[serde(rename = "ALCLT_PERC")]
    pub sewerage: Option<f64>,
    /// `GAS_PERC`, natural gas.
    #[serde(rename = "GAS_PERC")]
    pub gas: Option<f64>,
    /// `BASUR_PERC`, garbage collection.
    #[serde(rename = "BASUR_PERC")]
    pub garbage: Option<f64>,
    /// `INTER_PERC`, internet.
    #[serde(rename = "INTER_PERC")]
    pub internet: Option<f64>,
}

impl UtilityPercentages {
    /// Output column names in field order.
    pub const COLUMNS: [&'static str; 6] = [
        "ENRG_PERC",
        "ACUED_PERC",
        "ALCLT_PERC",
        "GAS_PERC",
        "BASUR_PERC",
        "INTER_PERC",
    ];

    /// Values in [`Self::COLUMNS`] order.
    #[must_use]
    pub const fn values(&self) -> [Option<f64>; 6] {
        [
            self.energy,
            self.aqueduct,
            self.sewerage,
            self.gas,
            self.garbage,
            self.internet,
        ]
    }
}

/// A rural section with its derived utility percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionAttributes {
    /// The panel row.
    pub record: SectionRecord,
    /// Percentages derived from `record`.
    pub percentages: UtilityPercentages,
}

impl SectionAttributes {
    /// The section code used as the clustering key, if present.
    #[must_use]
    pub fn section_code(&self) -> Option<&str> {
        self.record.section_code.as_deref()
    }
}

/// An alert joined against both boundary layers.
///
/// `None` on either side means no polygon of that layer contains the
/// alert (left join).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedAlert {
    /// The original alert.
    pub alert: Alert,
    /// Vereda attributes.
    pub admin: Option<AdminAttributes>,
    /// Rural section attributes.
    pub section: Option<SectionAttributes>,
}

impl EnrichedAlert {
    /// The rural section code this alert fell into, if any.
    #[must_use]
    pub fn section_code(&self) -> Option<&str> {
        self.section.as_ref().and_then(SectionAttributes::section_code)
    }
}

/// Identifier of a cluster. Assigned from 1 upward within a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClusterId(pub u32);

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An enriched alert with its cluster assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredAlert {
    /// Cluster this alert belongs to.
    pub cluster_id: ClusterId,
    /// The enriched alert.
    pub enriched: EnrichedAlert,
}
