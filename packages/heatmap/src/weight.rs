//! Report weight policy.
//!
//! Maps a report's endorsement count and status to the intensity it adds
//! to every ward containing it.

use civic_map_heatmap_models::{HeatPoint, WeightConfig};
use civic_map_report_models::{Report, ReportStatus};

/// Heatmap weight of a single report.
///
/// Archived reports contribute a small near-constant weight regardless of
/// endorsements: `max(min_archived_weight, base_weight * archived_weight_ratio)`.
/// All other statuses get `max(base_weight, base_weight + count * weight_multiplier)`,
/// which never drops below `base_weight` even with a negative multiplier.
#[must_use]
pub fn compute_weight(endorsement_count: u32, status: ReportStatus, config: &WeightConfig) -> f64 {
    match status {
        ReportStatus::Archived => config
            .min_archived_weight
            .max(config.base_weight * config.archived_weight_ratio),
        ReportStatus::Pending | ReportStatus::Verified | ReportStatus::Resolved => config
            .base_weight
            .max(config.base_weight + f64::from(endorsement_count) * config.weight_multiplier),
    }
}

/// One weighted point per report, for point-heatmap layers.
///
/// Reports without a finite position are skipped.
#[must_use]
pub fn heat_points(reports: &[Report], config: &WeightConfig) -> Vec<HeatPoint> {
    reports
        .iter()
        .filter(|r| r.position.is_finite())
        .map(|r| HeatPoint {
            lat: r.position.lat,
            lng: r.position.lng,
            intensity: compute_weight(r.endorsement_count, r.status, config),
        })
        .collect()
}
