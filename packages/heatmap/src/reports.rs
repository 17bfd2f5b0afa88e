//! Report input: decoding and filtering.

use std::path::Path;

use civic_map_report_models::{IssueCategory, Report};
use civic_map_ward::diagnostics::{DropReason, DropSink, DroppedElement, ElementKind};

use crate::HeatmapError;

/// Decodes a JSON array of reports.
///
/// Elements that do not decode as a [`Report`] are dropped, logged at
/// `debug` level and described to `sink`.
///
/// # Errors
///
/// Returns [`HeatmapError::Json`] if `json` is not valid JSON and
/// [`HeatmapError::NotIterable`] if the document is not an array.
pub fn load_reports(json: &str, sink: &dyn DropSink) -> Result<Vec<Report>, HeatmapError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(elements) = value else {
        return Err(HeatmapError::NotIterable {
            found: json_type(&value),
        });
    };

    let mut reports = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<Report>(element) {
            Ok(report) => reports.push(report),
            Err(e) => {
                log::debug!("Skipping report #{index}: {e}");
                sink.dropped(&DroppedElement {
                    kind: ElementKind::Report,
                    index,
                    reason: DropReason::Malformed {
                        message: e.to_string(),
                    },
                });
            }
        }
    }

    Ok(reports)
}

/// Reads and decodes a reports file.
///
/// # Errors
///
/// Returns [`HeatmapError`] if the file cannot be read or is not a JSON
/// array.
pub fn read_reports(path: &Path, sink: &dyn DropSink) -> Result<Vec<Report>, HeatmapError> {
    let contents = std::fs::read_to_string(path)?;
    let reports = load_reports(&contents, sink)?;
    log::info!("Loaded {} reports from {}", reports.len(), path.display());
    Ok(reports)
}

/// Reports tagged with `category`, in input order.
#[must_use]
pub fn filter_category(reports: &[Report], category: IssueCategory) -> Vec<Report> {
    reports
        .iter()
        .filter(|r| r.category == Some(category))
        .cloned()
        .collect()
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
