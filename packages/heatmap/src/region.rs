//! Viewport queries over reports.

use civic_map_geometry_models::Region;
use civic_map_report_models::Report;

/// Reports strictly inside the rectangular `region`, in input order.
///
/// A report exactly on an edge (`|lat - center.lat| == lat_delta / 2`)
/// is excluded. Reports with non-finite positions never match.
#[must_use]
pub fn filter_in_region(reports: &[Report], region: &Region) -> Vec<Report> {
    reports
        .iter()
        .filter(|r| region.contains(&r.position))
        .cloned()
        .collect()
}
