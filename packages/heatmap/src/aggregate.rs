//! Ward aggregation.
//!
//! Assigns every report to each ward whose boundary contains it, sums
//! counts and weights per ward, derives a fill opacity, and returns only
//! the wards that received at least one report.
//!
//! Wards may overlap, in which case a report is counted once in every
//! containing ward.

use std::num::NonZeroUsize;

use civic_map_geometry::PolygonExt as _;
use civic_map_geometry_models::Coordinate;
use civic_map_heatmap_models::{WardAggregate, WeightConfig};
use civic_map_report_models::Report;
use civic_map_spatial::WardIndex;
use civic_map_ward::diagnostics::{DropReason, DropSink, DroppedElement, ElementKind};
use civic_map_ward_models::Ward;
use rayon::prelude::*;

use crate::weight::compute_weight;

/// Source of ward containment answers for an aggregation pass.
///
/// Implemented by a plain ward slice (every ward is tested) and by
/// [`WardIndex`] (an R-tree prefilter). Both yield the same wards for the
/// same point.
pub trait WardLookup: Sync {
    /// Wards in dataset order.
    fn wards(&self) -> &[Ward];

    /// Calls `hit` with the position of every ward containing `point`,
    /// ascending.
    fn for_each_containing(&self, point: &Coordinate, hit: &mut dyn FnMut(usize));
}

impl WardLookup for [Ward] {
    fn wards(&self) -> &[Ward] {
        self
    }

    fn for_each_containing(&self, point: &Coordinate, hit: &mut dyn FnMut(usize)) {
        for (index, ward) in self.iter().enumerate() {
            if ward.boundary.contains_point(point) {
                hit(index);
            }
        }
    }
}

impl WardLookup for WardIndex {
    fn wards(&self) -> &[Ward] {
        WardIndex::wards(self)
    }

    fn for_each_containing(&self, point: &Coordinate, hit: &mut dyn FnMut(usize)) {
        for index in self.containing(point) {
            hit(index);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    report_count: u32,
    total_weight: f64,
}

impl Accumulator {
    fn add(&mut self, weight: f64) {
        self.report_count = self.report_count.saturating_add(1);
        self.total_weight += weight;
    }

    fn merge(&mut self, other: Self) {
        self.report_count = self.report_count.saturating_add(other.report_count);
        self.total_weight += other.total_weight;
    }
}

/// Aggregates reports into wards by testing every ward.
///
/// Reports with a non-finite position are skipped and described to `sink`.
/// The result holds one entry per ward with at least one report, ordered by
/// descending report count, then descending total weight, then ward order.
#[must_use]
pub fn aggregate(
    reports: &[Report],
    wards: &[Ward],
    config: &WeightConfig,
    sink: &dyn DropSink,
) -> Vec<WardAggregate> {
    aggregate_with(reports, wards, config, sink)
}

/// Same as [`aggregate`], using the R-tree prefilter of a [`WardIndex`].
#[must_use]
pub fn aggregate_indexed(
    reports: &[Report],
    index: &WardIndex,
    config: &WeightConfig,
    sink: &dyn DropSink,
) -> Vec<WardAggregate> {
    aggregate_with(reports, index, config, sink)
}

/// Aggregates with any [`WardLookup`] on the calling thread.
#[must_use]
pub fn aggregate_with<L: WardLookup + ?Sized>(
    reports: &[Report],
    lookup: &L,
    config: &WeightConfig,
    sink: &dyn DropSink,
) -> Vec<WardAggregate> {
    let accumulators = accumulate(reports, 0, lookup, config, sink);
    let aggregates = finish(lookup.wards(), accumulators, config);

    log::debug!(
        "Aggregated {} reports into {} of {} wards",
        reports.len(),
        aggregates.len(),
        lookup.wards().len()
    );

    aggregates
}

/// Aggregates with the reports split across a pool of `workers` threads.
///
/// Each chunk of reports is accumulated separately and the partial sums are
/// merged, so counts, ordering and opacities match [`aggregate_with`].
/// Weight sums may differ in the last bits because addition order changes.
/// Falls back to a sequential pass if the pool cannot be started.
#[must_use]
pub fn aggregate_parallel<L: WardLookup + ?Sized>(
    reports: &[Report],
    lookup: &L,
    config: &WeightConfig,
    workers: NonZeroUsize,
    sink: &dyn DropSink,
) -> Vec<WardAggregate> {
    let ward_count = lookup.wards().len();
    if reports.is_empty() || ward_count == 0 || workers.get() == 1 {
        return aggregate_with(reports, lookup, config, sink);
    }

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers.get())
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            log::warn!(
                "Failed to start {} aggregation workers, running sequentially: {e}",
                workers.get()
            );
            return aggregate_with(reports, lookup, config, sink);
        }
    };

    let chunk_size = reports.len().div_ceil(workers.get());
    log::debug!(
        "Aggregating {} reports on {} workers ({chunk_size} per chunk)",
        reports.len(),
        workers.get()
    );

    let totals = pool.install(|| {
        reports
            .par_chunks(chunk_size)
            .enumerate()
            .map(|(chunk, slice)| accumulate(slice, chunk * chunk_size, lookup, config, sink))
            .reduce(|| vec![Accumulator::default(); ward_count], merge)
    });

    finish(lookup.wards(), totals, config)
}

/// Fill opacity for a ward with the given total weight.
///
/// Uses the opacity of the highest threshold whose `count_threshold` is at
/// most `total_weight`, or `min_opacity` below every threshold. The result
/// is kept within `[min_opacity, max_opacity]`.
#[must_use]
pub fn opacity_for(total_weight: f64, config: &WeightConfig) -> f64 {
    let opacity = config
        .opacity_thresholds
        .iter()
        .filter(|t| total_weight >= t.count_threshold)
        .max_by(|a, b| a.count_threshold.total_cmp(&b.count_threshold))
        .map_or(config.min_opacity, |t| t.opacity);

    // Not `f64::clamp`: an unvalidated config may have min > max.
    opacity.max(config.min_opacity).min(config.max_opacity)
}

/// Sums reports from `reports` into one accumulator per ward.
///
/// `offset` is the position of `reports[0]` in the full input, used for
/// drop diagnostics.
fn accumulate<L: WardLookup + ?Sized>(
    reports: &[Report],
    offset: usize,
    lookup: &L,
    config: &WeightConfig,
    sink: &dyn DropSink,
) -> Vec<Accumulator> {
    let mut accumulators = vec![Accumulator::default(); lookup.wards().len()];

    for (i, report) in reports.iter().enumerate() {
        if !report.position.is_finite() {
            let index = offset + i;
            log::debug!("Skipping report #{index}: non-finite position");
            sink.dropped(&DroppedElement {
                kind: ElementKind::Report,
                index,
                reason: DropReason::NonFinitePosition,
            });
            continue;
        }

        let weight = compute_weight(report.endorsement_count, report.status, config);
        lookup.for_each_containing(&report.position, &mut |ward: usize| {
            accumulators[ward].add(weight);
        });
    }

    accumulators
}

fn merge(mut totals: Vec<Accumulator>, partial: Vec<Accumulator>) -> Vec<Accumulator> {
    for (total, part) in totals.iter_mut().zip(partial) {
        total.merge(part);
    }
    totals
}

fn finish(
    wards: &[Ward],
    accumulators: Vec<Accumulator>,
    config: &WeightConfig,
) -> Vec<WardAggregate> {
    let mut aggregates: Vec<WardAggregate> = wards
        .iter()
        .zip(accumulators)
        .filter(|(_, acc)| acc.report_count > 0)
        .map(|(ward, acc)| WardAggregate {
            ward: ward.clone(),
            report_count: acc.report_count,
            total_weight: acc.total_weight,
            visual_opacity: opacity_for(acc.total_weight, config),
        })
        .collect();

    // Stable, so ties keep ward order.
    aggregates.sort_by(|a, b| {
        b.report_count
            .cmp(&a.report_count)
            .then_with(|| b.total_weight.total_cmp(&a.total_weight))
    });

    aggregates
}
