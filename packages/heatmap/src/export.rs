//! Output shapes for rendering layers.

use civic_map_geometry::PolygonExt as _;
use civic_map_heatmap_models::{WardAggregate, WardAggregateRecord};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::json;

/// Flattens aggregates into serializable records, keeping their order.
#[must_use]
pub fn to_records(aggregates: &[WardAggregate]) -> Vec<WardAggregateRecord> {
    aggregates.iter().map(WardAggregateRecord::from).collect()
}

/// Builds a `GeoJSON` feature collection with one polygon feature per
/// aggregate.
///
/// Geometry is written in `GeoJSON` `[lng, lat]` order. Properties are
/// `name`, `reportCount`, `totalWeight`, `opacity` and `centroid`
/// (`[lng, lat]`).
#[must_use]
pub fn to_feature_collection(aggregates: &[WardAggregate]) -> FeatureCollection {
    let features = aggregates.iter().map(to_feature).collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn to_feature(aggregate: &WardAggregate) -> Feature {
    let ward = &aggregate.ward;
    let geometry = Geometry::new(geojson::Value::from(&ward.boundary.to_geo()));

    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), json!(ward.name));
    properties.insert("reportCount".to_string(), json!(aggregate.report_count));
    properties.insert("totalWeight".to_string(), json!(aggregate.total_weight));
    properties.insert("opacity".to_string(), json!(aggregate.visual_opacity));
    properties.insert(
        "centroid".to_string(),
        json!([ward.centroid.lng, ward.centroid.lat]),
    );

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
