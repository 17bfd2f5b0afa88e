#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index over ward boundaries.
//!
//! Builds an R-tree of ward bounding boxes so a point only needs the full
//! ray-casting test against wards whose box contains it. Containment
//! results are identical to testing every ward; the tree is only a
//! prefilter.

use civic_map_geometry::PolygonExt as _;
use civic_map_geometry_models::Coordinate;
use civic_map_ward_models::Ward;
use rstar::{AABB, RTree, RTreeObject};

/// A ward's bounding box stored in the R-tree, keyed by ward position.
struct WardEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for WardEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Wards plus an R-tree of their bounding boxes.
///
/// Constructed once per boundary dataset load and shared read-only by all
/// aggregation passes. Envelopes use `[lng, lat]` axes.
pub struct WardIndex {
    wards: Vec<Ward>,
    tree: RTree<WardEntry>,
}

impl WardIndex {
    /// Builds the index, taking ownership of `wards`.
    #[must_use]
    pub fn new(wards: Vec<Ward>) -> Self {
        let entries = wards
            .iter()
            .enumerate()
            .map(|(index, ward)| {
                let bbox = ward.boundary.bounding_box();
                WardEntry {
                    index,
                    envelope: AABB::from_corners([bbox.west, bbox.south], [bbox.east, bbox.north]),
                }
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::info!("Loaded {} wards into spatial index", tree.size());

        Self { wards, tree }
    }

    /// The indexed wards, in their original order.
    #[must_use]
    pub fn wards(&self) -> &[Ward] {
        &self.wards
    }

    /// Positions (in [`Self::wards`]) of every ward containing `point`,
    /// ascending.
    ///
    /// Wards may overlap, so more than one position can be returned.
    #[must_use]
    pub fn containing(&self, point: &Coordinate) -> Vec<usize> {
        if !point.is_finite() {
            return Vec::new();
        }

        let query_env = AABB::from_point([point.lng, point.lat]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| self.wards[entry.index].boundary.contains_point(point))
            .map(|entry| entry.index)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// The first ward (in original order) containing `point`, if any.
    #[must_use]
    pub fn lookup(&self, point: &Coordinate) -> Option<&Ward> {
        self.containing(point).first().map(|&i| &self.wards[i])
    }
}
