#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Point-in-polygon containment and ring helpers.
//!
//! Containment uses the even-odd (ray casting) rule over the implicit
//! closed ring. Rings are treated as planar with longitude on the x axis
//! and latitude on the y axis, which is accurate enough at ward scale.
//!
//! Points lying exactly on an edge or vertex may be classified either way.
//! Callers must not depend on boundary behaviour.

use civic_map_geometry_models::{BoundingBox, Coordinate, Polygon};
use geo::BoundingRect;

/// Returns `true` if `point` lies inside the closed ring `ring`.
///
/// An edge only counts as a crossing candidate when the point's latitude
/// is strictly above one endpoint and not above the other, so horizontal
/// edges never toggle and the intersection never divides by zero.
///
/// Rings with fewer than three vertices contain nothing.
#[must_use]
pub fn is_inside(point: &Coordinate, ring: &[Coordinate]) -> bool {
    if ring.len() < Polygon::MIN_VERTICES {
        return false;
    }

    let (px, py) = (point.lng, point.lat);
    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].lng, ring[i].lat);
        let (xj, yj) = (ring[j].lng, ring[j].lat);

        if (yi > py) != (yj > py) {
            let crossing_x = (xj - xi) * (py - yi) / (yj - yi) + xi;
            if px < crossing_x {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

/// Containment and conversions for validated [`Polygon`] rings.
pub trait PolygonExt {
    /// Returns `true` if `point` lies inside the ring. See [`is_inside`].
    fn contains_point(&self, point: &Coordinate) -> bool;

    /// Arithmetic mean of the ring's vertices. See [`vertex_centroid`].
    fn vertex_centroid(&self) -> Coordinate;

    /// Axis-aligned bounds of the ring.
    fn bounding_box(&self) -> BoundingBox;

    /// Converts the ring to a [`geo::Polygon`] with `x = lng`, `y = lat`.
    fn to_geo(&self) -> geo::Polygon<f64>;
}

impl PolygonExt for Polygon {
    fn contains_point(&self, point: &Coordinate) -> bool {
        is_inside(point, self.vertices())
    }

    fn vertex_centroid(&self) -> Coordinate {
        // A validated polygon always has vertices.
        vertex_centroid(self.vertices()).unwrap_or(Coordinate::new(f64::NAN, f64::NAN))
    }

    fn bounding_box(&self) -> BoundingBox {
        self.to_geo().bounding_rect().map_or_else(
            || BoundingBox::new(0.0, 0.0, 0.0, 0.0),
            |rect| BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
        )
    }

    fn to_geo(&self) -> geo::Polygon<f64> {
        let exterior: Vec<geo::Coord<f64>> = self
            .vertices()
            .iter()
            .map(|v| geo::coord! { x: v.lng, y: v.lat })
            .collect();
        geo::Polygon::new(geo::LineString::from(exterior), Vec::new())
    }
}

/// Arithmetic mean of all vertices in `ring`.
///
/// This is not the area-weighted centroid: vertex-dense stretches of a
/// boundary pull the result toward them. Label placement depends on this
/// exact behaviour.
///
/// Returns `None` for an empty ring.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn vertex_centroid(ring: &[Coordinate]) -> Option<Coordinate> {
    if ring.is_empty() {
        return None;
    }

    let (lat_sum, lng_sum) = ring
        .iter()
        .fold((0.0, 0.0), |(lat, lng), v| (lat + v.lat, lng + v.lng));
    let n = ring.len() as f64;

    Some(Coordinate::new(lat_sum / n, lng_sum / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points
            .iter()
            .map(|&(lat, lng)| Coordinate::new(lat, lng))
            .collect()
    }

    fn unit_square() -> Vec<Coordinate> {
        ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)])
    }

    #[test]
    fn square_contains_interior_points() {
        let square = unit_square();
        assert!(is_inside(&Coordinate::new(0.5, 0.5), &square));
        assert!(is_inside(&Coordinate::new(0.01, 0.99), &square));
    }

    #[test]
    fn square_excludes_exterior_points() {
        let square = unit_square();
        assert!(!is_inside(&Coordinate::new(1.5, 0.5), &square));
        assert!(!is_inside(&Coordinate::new(0.5, -0.5), &square));
        assert!(!is_inside(&Coordinate::new(-3.0, -3.0), &square));
    }

    #[test]
    fn ray_through_horizontal_edge_level_is_not_double_counted() {
        // The point shares its latitude with the top edge's vertices,
        // to the left of the shape.
        let square = unit_square();
        assert!(!is_inside(&Coordinate::new(1.0, -0.5), &square));
        assert!(!is_inside(&Coordinate::new(0.0, -0.5), &square));
    }

    #[test]
    fn concave_notch_is_outside() {
        // A "U" open to the north: the notch between the arms is outside.
        let u_shape = ring(&[
            (0.0, 0.0),
            (0.0, 3.0),
            (3.0, 3.0),
            (3.0, 2.0),
            (1.0, 2.0),
            (1.0, 1.0),
            (3.0, 1.0),
            (3.0, 0.0),
        ]);
        assert!(!is_inside(&Coordinate::new(2.0, 1.5), &u_shape));
        assert!(is_inside(&Coordinate::new(2.0, 0.5), &u_shape));
        assert!(is_inside(&Coordinate::new(2.0, 2.5), &u_shape));
        assert!(is_inside(&Coordinate::new(0.5, 1.5), &u_shape));
    }

    #[test]
    fn repeated_closing_vertex_does_not_change_result() {
        let mut closed = unit_square();
        closed.push(closed[0]);
        assert!(is_inside(&Coordinate::new(0.5, 0.5), &closed));
        assert!(!is_inside(&Coordinate::new(0.5, 1.5), &closed));
    }

    #[test]
    fn degenerate_rings_contain_nothing() {
        assert!(!is_inside(&Coordinate::new(0.0, 0.0), &[]));
        assert!(!is_inside(
            &Coordinate::new(0.5, 0.5),
            &ring(&[(0.0, 0.0), (1.0, 1.0)])
        ));
    }

    #[test]
    fn centroid_is_vertex_mean() {
        let c = vertex_centroid(&unit_square()).unwrap();
        assert!((c.lat - 0.5).abs() < f64::EPSILON);
        assert!((c.lng - 0.5).abs() < f64::EPSILON);
        assert_eq!(vertex_centroid(&[]), None);
    }

    #[test]
    fn centroid_is_biased_toward_dense_vertices() {
        // Extra vertices along the southern edge pull the mean south of
        // the true center.
        let dense = ring(&[
            (0.0, 0.0),
            (0.0, 0.25),
            (0.0, 0.5),
            (0.0, 0.75),
            (0.0, 1.0),
            (1.0, 1.0),
            (1.0, 0.0),
        ]);
        let c = vertex_centroid(&dense).unwrap();
        assert!(c.lat < 0.5);
    }

    #[test]
    fn polygon_bounding_box_uses_lng_as_x() {
        let polygon = Polygon::new(ring(&[(12.97, 77.59), (12.97, 77.60), (12.98, 77.60)]))
            .unwrap();
        let bbox = polygon.bounding_box();
        assert!((bbox.west - 77.59).abs() < 1e-12);
        assert!((bbox.east - 77.60).abs() < 1e-12);
        assert!((bbox.south - 12.97).abs() < 1e-12);
        assert!((bbox.north - 12.98).abs() < 1e-12);
    }

    /// Builds a convex polygon by walking a circle in angle order.
    fn convex_polygon_strategy() -> impl Strategy<Value = Vec<Coordinate>> {
        (
            -60.0..60.0f64,
            -170.0..170.0f64,
            0.001..1.0f64,
            0.0..std::f64::consts::TAU,
            prop::collection::vec(0.1..1.0f64, 3..12),
        )
            .prop_map(|(lat, lng, radius, offset, gaps)| {
                let total: f64 = gaps.iter().sum();
                let mut angle = offset;
                gaps.iter()
                    .map(|gap| {
                        angle += gap / total * std::f64::consts::TAU;
                        Coordinate::new(lat + radius * angle.sin(), lng + radius * angle.cos())
                    })
                    .collect()
            })
    }

    /// Cross-product test for a counter-clockwise convex ring. Returns the
    /// containment verdict and the smallest distance to an edge line.
    fn convex_reference(point: &Coordinate, ring: &[Coordinate]) -> (bool, f64) {
        let mut inside = true;
        let mut min_distance = f64::INFINITY;
        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            let (ex, ey) = (b.lng - a.lng, b.lat - a.lat);
            let cross = ex * (point.lat - a.lat) - ey * (point.lng - a.lng);
            let len = ex.hypot(ey);
            min_distance = min_distance.min(cross.abs() / len);
            if cross <= 0.0 {
                inside = false;
            }
        }
        (inside, min_distance)
    }

    proptest! {
        #[test]
        fn agrees_with_convex_cross_product_test(
            polygon in convex_polygon_strategy(),
            dlat in -2.0..2.0f64,
            dlng in -2.0..2.0f64,
        ) {
            let center = vertex_centroid(&polygon).unwrap();
            let point = Coordinate::new(center.lat + dlat, center.lng + dlng);
            let (expected, distance) = convex_reference(&point, &polygon);
            prop_assume!(distance > 1e-9);
            prop_assert_eq!(is_inside(&point, &polygon), expected);
        }

        #[test]
        fn vertex_centroid_of_convex_polygon_is_inside(polygon in convex_polygon_strategy()) {
            let center = vertex_centroid(&polygon).unwrap();
            prop_assert!(is_inside(&center, &polygon));
        }
    }
}
