#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Citizen issue report types.
//!
//! The reporting backend owns the full report record. The heatmap pipeline
//! only needs a position, a lifecycle status and an endorsement count, plus
//! a couple of optional fields used for filtering and display.

use civic_map_geometry_models::Coordinate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lifecycle status of a report.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportStatus {
    /// Submitted and awaiting community or moderator validation.
    Pending,
    /// Confirmed by endorsements or a moderator.
    Verified,
    /// The underlying issue has been fixed.
    Resolved,
    /// Historical report kept for context; heavily de-emphasized.
    Archived,
}

impl ReportStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::Verified, Self::Resolved, Self::Archived]
    }
}

/// Kind of urban issue a report describes.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IssueCategory {
    /// Uncollected garbage or illegal dumping
    Garbage,
    /// Open or overflowing sewage
    Sewage,
    /// Open burning of waste
    Burning,
    /// Air, water or noise pollution
    Pollution,
    /// Anything else
    Other,
}

/// A report as consumed by the heatmap pipeline.
///
/// Treated as an immutable snapshot for the duration of one aggregation
/// pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Backend identifier, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Where the issue was reported.
    pub position: Coordinate,
    /// Lifecycle status.
    pub status: ReportStatus,
    /// Number of community endorsements.
    #[serde(default)]
    pub endorsement_count: u32,
    /// Issue type, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<IssueCategory>,
}

impl Report {
    /// Creates a report with no identifier or category.
    #[must_use]
    pub const fn new(position: Coordinate, status: ReportStatus, endorsement_count: u32) -> Self {
        Self {
            id: None,
            position,
            status,
            endorsement_count,
            category: None,
        }
    }

    /// Sets the issue category.
    #[must_use]
    pub fn with_category(mut self, category: IssueCategory) -> Self {
        self.category = Some(category);
        self
    }
}
