#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Ward heatmap pipeline.
//!
//! Turns a snapshot of citizen reports and a list of ward boundaries into
//! per-ward counts, weights and fill opacities for a choropleth layer.
//! Every function here is pure over its inputs; configuration is passed in
//! by the caller (see the `civic_map_config` crate for the cached source).

pub mod aggregate;
pub mod export;
pub mod region;
pub mod reports;
pub mod weight;

use thiserror::Error;

pub use aggregate::{
    WardLookup, aggregate, aggregate_indexed, aggregate_parallel, aggregate_with, opacity_for,
};
pub use export::{to_feature_collection, to_records};
pub use region::filter_in_region;
pub use reports::{filter_category, load_reports, read_reports};
pub use weight::{compute_weight, heat_points};

/// Errors that can occur while loading pipeline inputs.
#[derive(Debug, Error)]
pub enum HeatmapError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The reports document is not an array.
    #[error("Expected an array of reports, found {found}")]
    NotIterable {
        /// JSON type that was found instead.
        found: &'static str,
    },
}
