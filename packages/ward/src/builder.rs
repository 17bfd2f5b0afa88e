//! Builds [`Ward`] records from raw boundary features.
//!
//! Uses the dataset's [`WardFieldMapping`] to find each feature's name and
//! boundary ring. A feature is either converted whole or dropped whole: a
//! ring with a single bad position never yields a partial polygon.

use civic_map_geometry::PolygonExt as _;
use civic_map_geometry_models::{Coordinate, InvalidPolygonError, Polygon};
use civic_map_ward_models::{GeometryExtractor, UNKNOWN_WARD_NAME, Ward, WardFieldMapping};

use crate::RawFeature;
use crate::diagnostics::{DropReason, DropSink, DroppedElement, ElementKind};

/// Builds wards from raw features, preserving input order.
///
/// Malformed features are dropped, logged at `debug` level and reported to
/// `sink`. Positions may carry a third (altitude) element, which is ignored.
#[must_use]
pub fn build_wards(
    features: &[RawFeature],
    fields: &WardFieldMapping,
    sink: &dyn DropSink,
) -> Vec<Ward> {
    features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| match build_ward(feature, fields) {
            Ok(ward) => Some(ward),
            Err(reason) => {
                log::debug!("Skipping ward feature #{index}: {reason}");
                sink.dropped(&DroppedElement {
                    kind: ElementKind::Ward,
                    index,
                    reason,
                });
                None
            }
        })
        .collect()
}

/// Converts a single feature into a ward.
///
/// # Errors
///
/// Returns the [`DropReason`] describing why the feature cannot be used.
pub fn build_ward(feature: &RawFeature, fields: &WardFieldMapping) -> Result<Ward, DropReason> {
    let ring = extract_ring(feature, fields.geometry)?;

    if ring.is_empty() {
        return Err(DropReason::EmptyRing);
    }

    let vertices = ring
        .iter()
        .enumerate()
        .map(|(vertex, position)| {
            parse_position(position).ok_or(DropReason::InvalidCoordinate { vertex })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let boundary = Polygon::new(vertices).map_err(|e| match e {
        InvalidPolygonError::TooFewVertices { count } => DropReason::TooFewVertices { count },
        InvalidPolygonError::NonFiniteVertex { index } => {
            DropReason::InvalidCoordinate { vertex: index }
        }
    })?;
    let centroid = boundary.vertex_centroid();

    Ok(Ward {
        name: ward_name(feature, fields),
        boundary,
        centroid,
    })
}

/// Finds the boundary ring positions for a feature.
fn extract_ring(
    feature: &RawFeature,
    extractor: GeometryExtractor,
) -> Result<&Vec<serde_json::Value>, DropReason> {
    let geometry = feature
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or(DropReason::MissingGeometry)?;

    let ring = match extractor {
        GeometryExtractor::Geojson => {
            let kind = geometry
                .get("type")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            let coordinates = geometry.get("coordinates");
            match kind {
                "Polygon" => coordinates.and_then(|c| c.get(0)),
                "MultiPolygon" => coordinates.and_then(|c| c.get(0)).and_then(|p| p.get(0)),
                other => {
                    return Err(DropReason::UnsupportedGeometry {
                        kind: other.to_string(),
                    });
                }
            }
        }
        GeometryExtractor::EsriRings => geometry.get("rings").and_then(|r| r.get(0)),
    };

    ring.and_then(serde_json::Value::as_array)
        .ok_or(DropReason::MissingRing)
}

/// Parses a source `[lng, lat]` (or `[lng, lat, alt]`) position into a
/// `(lat, lng)` coordinate.
fn parse_position(position: &serde_json::Value) -> Option<Coordinate> {
    let parts = position.as_array()?;
    if !(2..=3).contains(&parts.len()) {
        return None;
    }

    let numbers = parts
        .iter()
        .map(serde_json::Value::as_f64)
        .collect::<Option<Vec<f64>>>()?;
    if !numbers.iter().all(|n| n.is_finite()) {
        return None;
    }

    // Source order is longitude first.
    Some(Coordinate::new(numbers[1], numbers[0]))
}

/// Reads the ward name from the first usable name property.
///
/// Esri JSON features keep their fields under `attributes`; those are
/// searched before `properties`.
fn ward_name(feature: &RawFeature, fields: &WardFieldMapping) -> String {
    let containers: &[&str] = match fields.geometry {
        GeometryExtractor::Geojson => &["properties"],
        GeometryExtractor::EsriRings => &["attributes", "properties"],
    };

    containers
        .iter()
        .filter_map(|container| feature.get(*container))
        .flat_map(|props| {
            fields
                .name_properties
                .iter()
                .filter_map(move |key| props.get(key))
        })
        .find_map(|value| match value {
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| UNKNOWN_WARD_NAME.to_string())
}
