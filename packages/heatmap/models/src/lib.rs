#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Weight configuration and ward aggregate types.
//!
//! [`WeightConfig`] holds the tunable parameters of the weight policy and
//! opacity binning. It is read from an external configuration store, so
//! every field has a default and a partial document fills the gaps from
//! [`WeightConfig::default`].

use std::time::Duration;

use civic_map_geometry_models::Coordinate;
use civic_map_ward_models::Ward;
use serde::{Deserialize, Serialize};

/// One step of the opacity ramp: wards whose total weight reaches
/// `count_threshold` are drawn with `opacity`.
///
/// Serialized as a `[count_threshold, opacity]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct OpacityThreshold {
    /// Minimum total weight for this step.
    pub count_threshold: f64,
    /// Fill opacity for this step, in `[0, 1]`.
    pub opacity: f64,
}

impl OpacityThreshold {
    /// Creates a threshold step.
    #[must_use]
    pub const fn new(count_threshold: f64, opacity: f64) -> Self {
        Self {
            count_threshold,
            opacity,
        }
    }
}

impl From<(f64, f64)> for OpacityThreshold {
    fn from((count_threshold, opacity): (f64, f64)) -> Self {
        Self::new(count_threshold, opacity)
    }
}

impl From<OpacityThreshold> for (f64, f64) {
    fn from(t: OpacityThreshold) -> Self {
        (t.count_threshold, t.opacity)
    }
}

/// Tunable parameters for report weighting and ward opacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightConfig {
    /// Weight of a non-archived report with no endorsements.
    pub base_weight: f64,
    /// Extra weight per endorsement.
    pub weight_multiplier: f64,
    /// Fraction of `base_weight` given to archived reports, in `[0, 1]`.
    pub archived_weight_ratio: f64,
    /// Floor for archived report weight.
    pub min_archived_weight: f64,
    /// Opacity ramp, ascending by `count_threshold` once validated.
    pub opacity_thresholds: Vec<OpacityThreshold>,
    /// Opacity for wards below every threshold.
    pub min_opacity: f64,
    /// Upper bound on any ward's opacity.
    pub max_opacity: f64,
    /// How long a fetched config stays fresh.
    pub cache_ttl_seconds: u64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            base_weight: 1.0,
            weight_multiplier: 0.5,
            archived_weight_ratio: 0.25,
            min_archived_weight: 0.1,
            opacity_thresholds: vec![
                OpacityThreshold::new(1.0, 0.2),
                OpacityThreshold::new(3.0, 0.35),
                OpacityThreshold::new(5.0, 0.5),
                OpacityThreshold::new(10.0, 0.65),
                OpacityThreshold::new(20.0, 0.8),
            ],
            min_opacity: 0.1,
            max_opacity: 0.8,
            cache_ttl_seconds: 300,
        }
    }
}

impl WeightConfig {
    /// Freshness window for a cached copy of this config.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Checks every field and sorts the opacity ramp ascending.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] for non-finite numbers, negative
    /// weights, ratios or opacities outside `[0, 1]`, or an inverted opacity
    /// range.
    pub fn validated(mut self) -> Result<Self, ConfigValidationError> {
        let numbers = [
            ("baseWeight", self.base_weight),
            ("weightMultiplier", self.weight_multiplier),
            ("archivedWeightRatio", self.archived_weight_ratio),
            ("minArchivedWeight", self.min_archived_weight),
            ("minOpacity", self.min_opacity),
            ("maxOpacity", self.max_opacity),
        ];
        if let Some(&(field, _)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigValidationError::NonFinite { field });
        }

        for (field, value) in [
            ("baseWeight", self.base_weight),
            ("minArchivedWeight", self.min_archived_weight),
        ] {
            if value < 0.0 {
                return Err(ConfigValidationError::OutOfRange { field, value });
            }
        }

        for (field, value) in [
            ("archivedWeightRatio", self.archived_weight_ratio),
            ("minOpacity", self.min_opacity),
            ("maxOpacity", self.max_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::OutOfRange { field, value });
            }
        }

        if self.min_opacity > self.max_opacity {
            return Err(ConfigValidationError::InvertedOpacityRange {
                min: self.min_opacity,
                max: self.max_opacity,
            });
        }

        for threshold in &self.opacity_thresholds {
            if !threshold.count_threshold.is_finite() {
                return Err(ConfigValidationError::NonFinite {
                    field: "opacityThresholds",
                });
            }
            if !(0.0..=1.0).contains(&threshold.opacity) {
                return Err(ConfigValidationError::OutOfRange {
                    field: "opacityThresholds",
                    value: threshold.opacity,
                });
            }
        }

        self.opacity_thresholds
            .sort_by(|a, b| a.count_threshold.total_cmp(&b.count_threshold));

        Ok(self)
    }
}

/// Error returned when a [`WeightConfig`] fails validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValidationError {
    /// A numeric field is NaN or infinite.
    NonFinite {
        /// Offending field.
        field: &'static str,
    },
    /// A numeric field is outside its allowed range.
    OutOfRange {
        /// Offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// `minOpacity` is greater than `maxOpacity`.
    InvertedOpacityRange {
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite { field } => write!(f, "{field} must be a finite number"),
            Self::OutOfRange { field, value } => write!(f, "{field} value {value} is out of range"),
            Self::InvertedOpacityRange { min, max } => {
                write!(f, "minOpacity {min} is greater than maxOpacity {max}")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Reports aggregated into one ward for one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct WardAggregate {
    /// The ward the reports fell in.
    pub ward: Ward,
    /// Number of reports inside the ward.
    pub report_count: u32,
    /// Sum of the reports' heatmap weights.
    pub total_weight: f64,
    /// Fill opacity derived from `total_weight`.
    pub visual_opacity: f64,
}

/// Flat, serializable form of a [`WardAggregate`] for rendering layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardAggregateRecord {
    /// Ward name.
    pub name: String,
    /// Label position.
    pub centroid: Coordinate,
    /// Boundary ring in `(lat, lng)` order.
    pub polygon: Vec<Coordinate>,
    /// Number of reports inside the ward.
    pub report_count: u32,
    /// Sum of report weights.
    pub total_weight: f64,
    /// Fill opacity.
    pub opacity: f64,
}

impl From<&WardAggregate> for WardAggregateRecord {
    fn from(aggregate: &WardAggregate) -> Self {
        Self {
            name: aggregate.ward.name.clone(),
            centroid: aggregate.ward.centroid,
            polygon: aggregate.ward.boundary.vertices().to_vec(),
            report_count: aggregate.report_count,
            total_weight: aggregate.total_weight,
            opacity: aggregate.visual_opacity,
        }
    }
}

/// A single weighted point for point-heatmap layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Heatmap weight of the report at this point.
    pub intensity: f64,
}
