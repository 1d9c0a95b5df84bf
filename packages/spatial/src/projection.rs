//! Coordinate reference systems and UTM projection on the WGS84 ellipsoid.
//!
//! Distances between alerts and the buffers around them are measured in
//! meters, so every metric step projects geographic coordinates into the
//! UTM zone covering the data first and back afterwards. The projection
//! uses the Krüger series to sixth order in the third flattening, which is
//! accurate to well below a millimeter within a zone.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// UTM central scale factor.
const UTM_K0: f64 = 0.9996;

const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

static WGS84_TM: LazyLock<TransverseMercator> =
    LazyLock::new(|| TransverseMercator::new(WGS84_A, WGS84_F));

/// A coordinate reference system a layer or table is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Crs {
    /// Geographic longitude/latitude on WGS84 (EPSG:4326).
    Wgs84,
    /// Projected UTM coordinates in meters.
    Utm(UtmZone),
}

impl Crs {
    /// EPSG code of this reference system.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::Utm(zone) => zone.epsg(),
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// A UTM zone: a six-degree longitude band in one hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtmZone {
    /// Zone number, 1 through 60.
    pub number: u8,
    /// Northern hemisphere (`true`) or southern.
    pub north: bool,
}

impl UtmZone {
    /// The zone containing a longitude/latitude.
    ///
    /// Uses the regular six-degree grid (no Norway/Svalbard exceptions).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn for_lon_lat(lon: f64, lat: f64) -> Self {
        let band = ((lon + 180.0) / 6.0).floor() as i64 + 1;
        let number = band.clamp(1, 60) as u8;
        Self {
            number,
            north: lat >= 0.0,
        }
    }

    /// Picks the zone for a set of points from the center of their
    /// bounding box. Returns `None` for an empty set.
    #[must_use]
    pub fn estimate<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for (lon, lat) in points {
            bounds = Some(match bounds {
                None => (lon, lat, lon, lat),
                Some((min_x, min_y, max_x, max_y)) => {
                    (min_x.min(lon), min_y.min(lat), max_x.max(lon), max_y.max(lat))
                }
            });
        }
        bounds.map(|(min_x, min_y, max_x, max_y)| {
            Self::for_lon_lat(f64::midpoint(min_x, max_x), f64::midpoint(min_y, max_y))
        })
    }

    /// EPSG code (`326xx` north, `327xx` south).
    #[must_use]
    pub const fn epsg(self) -> u32 {
        let base = if self.north { 32_600 } else { 32_700 };
        base + self.number as u32
    }

    /// Longitude of the zone's central meridian in degrees.
    #[must_use]
    pub fn central_meridian(self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }

    /// Projects a longitude/latitude to `(easting, northing)` in meters.
    #[must_use]
    pub fn project(self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = WGS84_TM.forward(lon - self.central_meridian(), lat);
        let easting = x.mul_add(UTM_K0, UTM_FALSE_EASTING);
        let northing = y * UTM_K0 + if self.north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH };
        (easting, northing)
    }

    /// Inverse of [`Self::project`]: `(easting, northing)` to
    /// `(longitude, latitude)` in degrees.
    #[must_use]
    pub fn unproject(self, easting: f64, northing: f64) -> (f64, f64) {
        let x = (easting - UTM_FALSE_EASTING) / UTM_K0;
        let y = (northing - if self.north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH }) / UTM_K0;
        let (dlon, lat) = WGS84_TM.inverse(x, y);
        (dlon + self.central_meridian(), lat)
    }

    /// [`Self::unproject`] for a [`geo::Coord`].
    #[must_use]
    pub fn unproject_coord(self, coord: geo::Coord<f64>) -> geo::Coord<f64> {
        let (x, y) = self.unproject(coord.x, coord.y);
        geo::Coord { x, y }
    }
}

impl std::fmt::Display for UtmZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.number, if self.north { 'N' } else { 'S' })
    }
}

/// Unscaled transverse Mercator on an ellipsoid, centered on meridian 0.
struct TransverseMercator {
    /// First eccentricity.
    e: f64,
    /// Rectifying radius.
    big_a: f64,
    /// Forward series coefficients, index 0 unused.
    alpha: [f64; 7],
    /// Inverse series coefficients, index 0 unused.
    beta: [f64; 7],
}

impl TransverseMercator {
    fn new(a: f64, f: f64) -> Self {
        let e = (f * (2.0 - f)).sqrt();
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let big_a = a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            0.0,
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
                + 7891.0 / 37800.0 * n6,
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
                - 1_983_433.0 / 1_935_360.0 * n6,
            61.0 / 240.0 * n3 - 103.0 / 140.0 * n4
                + 15061.0 / 26880.0 * n5
                + 167_603.0 / 181_440.0 * n6,
            49561.0 / 161_280.0 * n4 - 179.0 / 168.0 * n5 + 6_601_661.0 / 7_257_600.0 * n6,
            34729.0 / 80640.0 * n5 - 3_418_889.0 / 1_995_840.0 * n6,
            212_378_941.0 / 319_334_400.0 * n6,
        ];

        let beta = [
            0.0,
            n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
                + 96199.0 / 604_800.0 * n6,
            n2 / 48.0 + n3 / 15.0 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
                - 1_118_711.0 / 3_870_720.0 * n6,
            17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
            4397.0 / 161_280.0 * n4 - 11.0 / 504.0 * n5 - 830_251.0 / 7_257_600.0 * n6,
            4583.0 / 161_280.0 * n5 - 108_847.0 / 3_991_680.0 * n6,
            20_648_693.0 / 638_668_800.0 * n6,
        ];

        Self {
            e,
            big_a,
            alpha,
            beta,
        }
    }

    /// Conformal latitude tangent from geodetic latitude tangent.
    fn conformal_tan(&self, tau: f64) -> f64 {
        let sigma = (self.e * (self.e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
        tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt()
    }

    /// `dlon`/`lat` in degrees to unscaled `(x, y)` meters.
    fn forward(&self, dlon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let lambda = dlon.to_radians();

        let tau_prime = self.conformal_tan(phi.tan());
        let (sin_l, cos_l) = lambda.sin_cos();

        let xi_prime = tau_prime.atan2(cos_l);
        let eta_prime = (sin_l / tau_prime.hypot(cos_l)).asinh();

        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, alpha) in self.alpha.iter().enumerate().skip(1) {
            #[allow(clippy::cast_precision_loss)]
            let k = 2.0 * j as f64;
            xi += alpha * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += alpha * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        (self.big_a * eta, self.big_a * xi)
    }

    /// Unscaled `(x, y)` meters to `dlon`/`lat` in degrees.
    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let eta = x / self.big_a;
        let xi = y / self.big_a;

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, beta) in self.beta.iter().enumerate().skip(1) {
            #[allow(clippy::cast_precision_loss)]
            let k = 2.0 * j as f64;
            xi_prime -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta = eta_prime.sinh();
        let (sin_xi, cos_xi) = xi_prime.sin_cos();
        let tau_prime = sin_xi / sinh_eta.hypot(cos_xi);

        // Newton iteration for the geodetic latitude tangent.
        let e2 = self.e * self.e;
        let mut tau = tau_prime;
        for _ in 0..16 {
            let tau_i_prime = self.conformal_tan(tau);
            let delta = (tau_prime - tau_i_prime) / tau_i_prime.mul_add(tau_i_prime, 1.0).sqrt()
                * (1.0 + (1.0 - e2) * tau * tau)
                / ((1.0 - e2) * tau.mul_add(tau, 1.0).sqrt());
            tau += delta;
            if delta.abs() < 1e-12 {
                break;
            }
        }

        let lat = tau.atan().to_degrees();
        let dlon = sinh_eta.atan2(cos_xi).to_degrees();
        (dlon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_for_bogota_is_18n() {
        let zone = UtmZone::for_lon_lat(-74.08, 4.6);
        assert_eq!(zone.number, 18);
        assert!(zone.north);
        assert_eq!(zone.epsg(), 32618);
        assert_eq!(zone.to_string(), "18N");
        assert!((zone.central_meridian() - -75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zone_edges_clamp_to_valid_range() {
        assert_eq!(UtmZone::for_lon_lat(-180.0, 0.0).number, 1);
        assert_eq!(UtmZone::for_lon_lat(180.0, 0.0).number, 60);
        assert!(!UtmZone::for_lon_lat(-70.0, -0.5).north);
        assert_eq!(UtmZone::for_lon_lat(-70.0, -0.5).epsg(), 32719);
    }

    #[test]
    fn estimate_uses_bounds_center() {
        let zone = UtmZone::estimate([(-78.1, 1.0), (-71.9, 3.0)]).unwrap();
        assert_eq!(zone.number, 18);
        assert!(UtmZone::estimate(std::iter::empty()).is_none());
    }

    #[test]
    fn central_meridian_on_equator_maps_to_false_origin() {
        let zone = UtmZone {
            number: 31,
            north: true,
        };
        let (e, n) = zone.project(3.0, 0.0);
        assert!((e - 500_000.0).abs() < 1e-6, "easting {e}");
        assert!(n.abs() < 1e-6, "northing {n}");
    }

    #[test]
    fn southern_hemisphere_uses_false_northing() {
        let zone = UtmZone {
            number: 18,
            north: false,
        };
        let (_, n) = zone.project(-75.0, -1.0);
        assert!(n < UTM_FALSE_NORTHING_SOUTH && n > 9_800_000.0, "northing {n}");
    }

    #[test]
    fn round_trip_is_sub_millimeter() {
        let zone = UtmZone::for_lon_lat(-73.5, 2.3);
        for &(lon, lat) in &[(-73.5, 2.3), (-77.9, 0.1), (-72.1, 7.8), (-75.0, 4.0)] {
            let (e, n) = zone.project(lon, lat);
            let (lon2, lat2) = zone.unproject(e, n);
            // 1e-8 degrees is about 1 mm.
            assert!((lon - lon2).abs() < 1e-8, "lon {lon} -> {lon2}");
            assert!((lat - lat2).abs() < 1e-8, "lat {lat} -> {lat2}");
        }
    }

    #[test]
    fn meridian_distance_is_metric() {
        let zone = UtmZone::for_lon_lat(-75.0, 4.6);
        let (_, n1) = zone.project(-75.0, 4.60);
        let (_, n2) = zone.project(-75.0, 4.61);
        // One hundredth of a degree of latitude near 4.6N is about 1105.8 m,
        // scaled by k0 on the central meridian.
        let d = n2 - n1;
        assert!((d - 1105.8 * UTM_K0).abs() < 2.0, "distance {d}");
    }

    #[test]
    fn crs_display_uses_epsg() {
        assert_eq!(Crs::Wgs84.to_string(), "EPSG:4326");
        let zone = UtmZone {
            number: 18,
            north: true,
        };
        assert_eq!(Crs::Utm(zone).to_string(), "EPSG:32618");
    }
}
