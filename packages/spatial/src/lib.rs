#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial indexes for alert enrichment and clustering.
//!
//! [`BoundaryIndex`] builds an R-tree over a polygon layer (veredas or
//! rural sections) and answers point-in-polygon lookups with an explicit
//! "first feature in layer order wins" tie-break. [`PointIndex`] answers
//! fixed-radius neighbour queries over projected alert coordinates.
//! [`projection`] holds the UTM projection used for all metric work.

pub mod projection;

use geo::{Contains, MultiPolygon};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree, RTreeObject};

pub use projection::{Crs, UtmZone};

/// A polygon feature of a boundary layer with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary<T> {
    /// Polygon geometry (single polygons are wrapped).
    pub polygon: MultiPolygon<f64>,
    /// Attribute row.
    pub attributes: T,
}

/// A polygon layer tagged with its coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLayer<T> {
    /// CRS the polygon coordinates are expressed in.
    pub crs: Crs,
    /// Features in file order.
    pub boundaries: Vec<Boundary<T>>,
}

impl<T> BoundaryLayer<T> {
    /// Number of polygon features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Whether the layer holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}

/// Envelope of one layer feature stored in the R-tree.
struct BoundaryEntry {
    /// Position of the feature in the layer.
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Result of a point-in-polygon lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryMatch<'a, T> {
    /// Position of the chosen feature in the layer (the lowest one that
    /// contains the point).
    pub position: usize,
    /// Attributes of the chosen feature.
    pub attributes: &'a T,
    /// Number of features that contain the point. More than one means the
    /// layer overlaps here and the choice was a tie-break.
    pub containing: usize,
}

impl<T> BoundaryMatch<'_, T> {
    /// Whether more than one polygon contained the point.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        self.containing > 1
    }
}

/// R-tree backed point-in-polygon index over a [`BoundaryLayer`].
pub struct BoundaryIndex<T> {
    boundaries: Vec<Boundary<T>>,
    tree: RTree<BoundaryEntry>,
}

impl<T> BoundaryIndex<T> {
    /// Builds the index, taking ownership of the layer.
    #[must_use]
    pub fn new(layer: BoundaryLayer<T>) -> Self {
        let entries = layer
            .boundaries
            .iter()
            .enumerate()
            .filter_map(|(position, boundary)| {
                compute_envelope(&boundary.polygon)
                    .map(|envelope| BoundaryEntry { position, envelope })
            })
            .collect();

        Self {
            boundaries: layer.boundaries,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Whether the index holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Looks up the polygon containing a point.
    ///
    /// When several polygons contain the point, the one appearing first in
    /// the layer wins; [`BoundaryMatch::containing`] reports how many did.
    /// Points on a polygon edge are not contained.
    #[must_use]
    pub fn lookup(&self, x: f64, y: f64) -> Option<BoundaryMatch<'_, T>> {
        let point = geo::Point::new(x, y);
        let query_env = AABB::from_point([x, y]);

        let mut best: Option<usize> = None;
        let mut containing = 0usize;

        for entry in self.tree.locate_in_envelope_intersecting(&query_env) {
            if self.boundaries[entry.position].polygon.contains(&point) {
                containing += 1;
                best = Some(best.map_or(entry.position, |b| b.min(entry.position)));
            }
        }

        best.map(|position| BoundaryMatch {
            position,
            attributes: &self.boundaries[position].attributes,
            containing,
        })
    }
}

/// Fixed-radius neighbour index over planar (projected) points.
pub struct PointIndex {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl PointIndex {
    /// Indexes `points`; neighbours are reported by their position in this
    /// slice.
    #[must_use]
    pub fn new(points: &[[f64; 2]]) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new(*p, i))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Positions of all points within `radius` (inclusive) of `point`,
    /// including the point itself if it was indexed.
    pub fn within(&self, point: [f64; 2], radius: f64) -> impl Iterator<Item = usize> + '_ {
        self.tree
            .locate_within_distance(point, radius * radius)
            .map(|entry| entry.data)
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
///
/// Handles both `Polygon` and `MultiPolygon` geometry types; anything
/// else yields `None`.
#[must_use]
pub fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        other => {
            log::debug!("Ignoring non-polygonal geometry: {other:?}");
            None
        }
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`]. Empty
/// geometries have none.
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    use geo::BoundingRect;

    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    fn layer(features: Vec<(MultiPolygon<f64>, &'static str)>) -> BoundaryLayer<&'static str> {
        BoundaryLayer {
            crs: Crs::Wgs84,
            boundaries: features
                .into_iter()
                .map(|(polygon, attributes)| Boundary {
                    polygon,
                    attributes,
                })
                .collect(),
        }
    }

    #[test]
    fn finds_containing_polygon() {
        let index = BoundaryIndex::new(layer(vec![
            (square(0.0, 0.0, 1.0), "a"),
            (square(2.0, 0.0, 1.0), "b"),
        ]));
        let hit = index.lookup(2.5, 0.5).unwrap();
        assert_eq!(*hit.attributes, "b");
        assert_eq!(hit.position, 1);
        assert!(!hit.is_ambiguous());
    }

    #[test]
    fn misses_outside_all_polygons() {
        let index = BoundaryIndex::new(layer(vec![(square(0.0, 0.0, 1.0), "a")]));
        assert!(index.lookup(1.5, 0.5).is_none());
    }

    #[test]
    fn overlapping_polygons_pick_first_in_layer_order() {
        let index = BoundaryIndex::new(layer(vec![
            (square(5.0, 5.0, 1.0), "unrelated"),
            (square(0.0, 0.0, 2.0), "first"),
            (square(1.0, 1.0, 2.0), "second"),
        ]));
        let hit = index.lookup(1.5, 1.5).unwrap();
        assert_eq!(*hit.attributes, "first");
        assert_eq!(hit.containing, 2);
        assert!(hit.is_ambiguous());
    }

    #[test]
    fn edge_points_are_not_contained() {
        let index = BoundaryIndex::new(layer(vec![(square(0.0, 0.0, 1.0), "a")]));
        assert!(index.lookup(1.0, 0.5).is_none());
    }

    #[test]
    fn point_index_radius_is_inclusive() {
        let index = PointIndex::new(&[[0.0, 0.0], [3.0, 4.0], [10.0, 0.0]]);
        let mut hits: Vec<usize> = index.within([0.0, 0.0], 5.0).collect();
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
    }

    fn parse_geometry(s: &str) -> geojson::Geometry {
        match s.parse::<geojson::GeoJson>().unwrap() {
            geojson::GeoJson::Geometry(geometry) => geometry,
            other => panic!("expected a geometry, got {other:?}"),
        }
    }

    #[test]
    fn converts_polygon_geometry() {
        let geometry =
            parse_geometry(r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#);
        let mp = geometry_to_multipolygon(geometry).unwrap();
        assert_eq!(mp.0.len(), 1);

        let point = parse_geometry(r#"{"type":"Point","coordinates":[0,0]}"#);
        assert!(geometry_to_multipolygon(point).is_none());
    }
}
