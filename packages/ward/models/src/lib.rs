#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Ward boundary types.
//!
//! Defines the normalized [`Ward`] record produced from an administrative
//! boundary dataset and the [`WardFieldMapping`] describing how to read a
//! particular dataset's features.

use civic_map_geometry_models::{Coordinate, Polygon};
use serde::{Deserialize, Serialize};

/// Name given to wards whose feature carries no usable name property.
pub const UNKNOWN_WARD_NAME: &str = "Unknown";

/// An administrative ward: the unit of spatial aggregation.
///
/// Built once per load of the boundary dataset and never mutated; a
/// dataset reload rebuilds every ward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ward {
    /// Human-readable ward name.
    pub name: String,
    /// Boundary ring in `(lat, lng)` order.
    pub boundary: Polygon,
    /// Mean of the boundary vertices, used for label placement.
    pub centroid: Coordinate,
}

/// How to read ward names and geometry from a boundary dataset's features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardFieldMapping {
    /// Property fields to try, in order, for the ward name.
    #[serde(default = "default_name_properties")]
    pub name_properties: Vec<String>,
    /// How to extract the boundary ring from each feature.
    #[serde(default)]
    pub geometry: GeometryExtractor,
}

impl Default for WardFieldMapping {
    fn default() -> Self {
        Self {
            name_properties: default_name_properties(),
            geometry: GeometryExtractor::default(),
        }
    }
}

fn default_name_properties() -> Vec<String> {
    vec![
        "name".to_string(),
        "ward_name".to_string(),
        "WARD_NAME".to_string(),
    ]
}

/// How to extract a boundary ring from a feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryExtractor {
    /// Standard `GeoJSON` `Polygon` or `MultiPolygon` geometry. The outer
    /// ring of the first polygon is used.
    #[default]
    Geojson,
    /// Esri JSON geometry (`{ "rings": [...] }`). The first ring is used and
    /// names are read from the feature's `attributes`.
    EsriRings,
}
