#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Ward boundary parsing and normalization.
//!
//! Reads an administrative boundary dataset (a `GeoJSON`-like feature
//! collection with `[lng, lat]` positions) and produces the ordered list of
//! [`Ward`] records the heatmap pipeline aggregates into. Individual
//! malformed features are dropped and described to a
//! [`diagnostics::DropSink`]; only an input that is not a feature sequence
//! at all is an error.

pub mod builder;
pub mod diagnostics;

use std::path::Path;

use civic_map_ward_models::{Ward, WardFieldMapping};
use thiserror::Error;

pub use builder::{build_ward, build_wards};

/// A raw boundary feature as read from the dataset.
pub type RawFeature = serde_json::Value;

/// Errors that can occur while loading a boundary dataset.
#[derive(Debug, Error)]
pub enum WardError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not a feature collection or feature array.
    #[error("Expected a FeatureCollection or an array of features, found {found}")]
    NotIterable {
        /// JSON type that was found instead.
        found: &'static str,
    },
}

/// Extracts the feature list from a boundary dataset document.
///
/// Accepts a `GeoJSON` `FeatureCollection` or a bare array of features.
///
/// # Errors
///
/// Returns [`WardError::Json`] if `json` is not valid JSON and
/// [`WardError::NotIterable`] if it holds no feature sequence.
pub fn parse_feature_collection(json: &str) -> Result<Vec<RawFeature>, WardError> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    match value {
        serde_json::Value::Array(features) => Ok(features),
        serde_json::Value::Object(mut map) => match map.remove("features") {
            Some(serde_json::Value::Array(features)) => Ok(features),
            Some(other) => Err(WardError::NotIterable {
                found: json_type(&other),
            }),
            None => Err(WardError::NotIterable { found: "object" }),
        },
        other => Err(WardError::NotIterable {
            found: json_type(&other),
        }),
    }
}

/// Reads a boundary dataset file and builds its wards.
///
/// # Errors
///
/// Returns [`WardError`] if the file cannot be read or does not contain a
/// feature sequence.
pub fn load_wards(
    path: &Path,
    fields: &WardFieldMapping,
    sink: &dyn diagnostics::DropSink,
) -> Result<Vec<Ward>, WardError> {
    let contents = std::fs::read_to_string(path)?;
    let features = parse_feature_collection(&contents)?;
    let wards = build_wards(&features, fields, sink);

    log::info!(
        "Built {} wards from {} features in {}",
        wards.len(),
        features.len(),
        path.display()
    );

    Ok(wards)
}

const fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
