#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Coordinate, polygon and map region types.
//!
//! These are the geometric primitives shared by the ward index, the
//! aggregation pipeline and the viewport query. All coordinates are WGS84
//! degrees stored in `(lat, lng)` order.

use serde::{Deserialize, Serialize};

/// A point on the map in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Creates a coordinate from a latitude and a longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` if both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Error returned when a vertex list cannot form a [`Polygon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidPolygonError {
    /// Fewer than three vertices were supplied.
    TooFewVertices {
        /// Number of vertices supplied.
        count: usize,
    },
    /// A vertex had a non-finite latitude or longitude.
    NonFiniteVertex {
        /// Position of the offending vertex in the ring.
        index: usize,
    },
}

impl std::fmt::Display for InvalidPolygonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewVertices { count } => {
                write!(f, "polygon needs at least 3 vertices, got {count}")
            }
            Self::NonFiniteVertex { index } => {
                write!(f, "polygon vertex {index} is not a finite coordinate")
            }
        }
    }
}

impl std::error::Error for InvalidPolygonError {}

/// A simple closed ring of at least three finite vertices.
///
/// The ring is implicitly closed: the last vertex connects back to the
/// first. Vertices are kept exactly as supplied, so a GeoJSON-style
/// repeated closing vertex is retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct Polygon {
    vertices: Vec<Coordinate>,
}

impl Polygon {
    /// Minimum number of vertices for a non-degenerate ring.
    pub const MIN_VERTICES: usize = 3;

    /// Validates `vertices` and wraps them in a polygon.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPolygonError`] if there are fewer than three
    /// vertices or any vertex is not finite.
    pub fn new(vertices: Vec<Coordinate>) -> Result<Self, InvalidPolygonError> {
        if vertices.len() < Self::MIN_VERTICES {
            return Err(InvalidPolygonError::TooFewVertices {
                count: vertices.len(),
            });
        }

        if let Some(index) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(InvalidPolygonError::NonFiniteVertex { index });
        }

        Ok(Self { vertices })
    }

    /// Returns the ring's vertices in order.
    #[must_use]
    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    /// Returns the number of vertices in the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always `false`; a valid polygon has at least three vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl TryFrom<Vec<Coordinate>> for Polygon {
    type Error = InvalidPolygonError;

    fn try_from(vertices: Vec<Coordinate>) -> Result<Self, Self::Error> {
        Self::new(vertices)
    }
}

impl From<Polygon> for Vec<Coordinate> {
    fn from(polygon: Polygon) -> Self {
        polygon.vertices
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Parses a bounding box string `"west,south,east,north"`.
    ///
    /// Returns `None` unless exactly four numbers are present.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse().ok())
            .collect::<Option<_>>()?;
        if parts.len() == 4 {
            Some(Self::new(parts[0], parts[1], parts[2], parts[3]))
        } else {
            None
        }
    }
}

/// A map viewport: a center point and the full latitude/longitude span
/// visible around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Center of the viewport.
    pub center: Coordinate,
    /// Full latitude span (degrees); half lies on each side of the center.
    pub lat_delta: f64,
    /// Full longitude span (degrees); half lies on each side of the center.
    pub lng_delta: f64,
}

impl Region {
    /// Creates a region around `center`.
    #[must_use]
    pub const fn new(center: Coordinate, lat_delta: f64, lng_delta: f64) -> Self {
        Self {
            center,
            lat_delta,
            lng_delta,
        }
    }

    /// Builds the region that covers `bbox` exactly.
    #[must_use]
    pub fn from_bounding_box(bbox: &BoundingBox) -> Self {
        Self {
            center: Coordinate::new(
                f64::midpoint(bbox.south, bbox.north),
                f64::midpoint(bbox.west, bbox.east),
            ),
            lat_delta: bbox.north - bbox.south,
            lng_delta: bbox.east - bbox.west,
        }
    }

    /// Returns the edges of this region as a [`BoundingBox`].
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.center.lng - self.lng_delta / 2.0,
            self.center.lat - self.lat_delta / 2.0,
            self.center.lng + self.lng_delta / 2.0,
            self.center.lat + self.lat_delta / 2.0,
        )
    }

    /// Open-interval bounding-box test on both axes.
    ///
    /// Points lying exactly on an edge are outside. This is a box test, not
    /// a distance test.
    #[must_use]
    pub fn contains(&self, point: &Coordinate) -> bool {
        let bbox = self.bounding_box();
        bbox.south < point.lat
            && point.lat < bbox.north
            && bbox.west < point.lng
            && point.lng < bbox.east
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_rejects_short_rings() {
        let err = Polygon::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)])
            .unwrap_err();
        assert_eq!(err, InvalidPolygonError::TooFewVertices { count: 2 });
    }

    #[test]
    fn polygon_rejects_non_finite_vertices() {
        let err = Polygon::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(f64::NAN, 1.0),
            Coordinate::new(1.0, 0.0),
        ])
        .unwrap_err();
        assert_eq!(err, InvalidPolygonError::NonFiniteVertex { index: 1 });
    }

    #[test]
    fn polygon_deserialization_validates() {
        let ok: Result<Polygon, _> = serde_json::from_str(
            r#"[{"lat":0.0,"lng":0.0},{"lat":1.0,"lng":0.0},{"lat":1.0,"lng":1.0}]"#,
        );
        assert_eq!(ok.unwrap().len(), 3);

        let short: Result<Polygon, _> =
            serde_json::from_str(r#"[{"lat":0.0,"lng":0.0},{"lat":1.0,"lng":0.0}]"#);
        assert!(short.is_err());
    }

    #[test]
    fn parses_bbox_strings() {
        assert_eq!(
            BoundingBox::parse("77.5, 12.9, 77.7, 13.1"),
            Some(BoundingBox::new(77.5, 12.9, 77.7, 13.1))
        );
        assert_eq!(BoundingBox::parse("77.5,12.9,77.7"), None);
        assert_eq!(BoundingBox::parse("77.5,12.9,east,13.1"), None);
    }

    #[test]
    fn region_bounding_box_round_trips() {
        let bbox = BoundingBox::new(-1.0, -0.5, 1.0, 0.5);
        let region = Region::from_bounding_box(&bbox);
        assert_eq!(region.center, Coordinate::new(0.0, 0.0));
        assert_eq!(region.bounding_box(), bbox);
    }

    #[test]
    fn region_edges_are_exclusive() {
        let region = Region::new(Coordinate::new(0.5, 0.5), 0.5, 0.5);
        assert!(!region.contains(&Coordinate::new(0.25, 0.5)));
        assert!(!region.contains(&Coordinate::new(0.5, 0.75)));
        assert!(region.contains(&Coordinate::new(0.251, 0.5)));
        assert!(region.contains(&Coordinate::new(0.5, 0.749)));
    }
}
