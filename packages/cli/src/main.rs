#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Command-line driver for the ward heatmap pipeline.
//!
//! Loads a ward boundary dataset and a reports snapshot from disk, runs one
//! aggregation pass and prints the result as JSON on stdout. Logs go to
//! stderr and are controlled by `RUST_LOG`.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use civic_map_config::{ConfigCache, FileSource, StaticSource};
use civic_map_geometry_models::{BoundingBox, Coordinate, Region};
use civic_map_heatmap::{
    aggregate_parallel, filter_category, filter_in_region, heat_points, read_reports,
    to_feature_collection, to_records,
};
use civic_map_heatmap_models::WeightConfig;
use civic_map_report_models::IssueCategory;
use civic_map_spatial::WardIndex;
use civic_map_ward::diagnostics::{CountingSink, ElementKind};
use civic_map_ward::load_wards;
use civic_map_ward_models::WardFieldMapping;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "civic_map", about = "Ward heatmap aggregation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build wards from a boundary dataset and print a summary
    Wards {
        /// Boundary dataset (`GeoJSON` `FeatureCollection` or feature array)
        #[arg(long)]
        wards: PathBuf,
        /// TOML file describing which properties hold names and geometry
        #[arg(long)]
        fields: Option<PathBuf>,
    },
    /// Aggregate reports into wards
    Aggregate {
        /// Boundary dataset
        #[arg(long)]
        wards: PathBuf,
        /// TOML field mapping for the boundary dataset
        #[arg(long)]
        fields: Option<PathBuf>,
        /// JSON array of reports
        #[arg(long)]
        reports: PathBuf,
        /// Weight config file (TOML or JSON); built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only aggregate reports in this issue category
        #[arg(long, value_parser = parse_category)]
        category: Option<IssueCategory>,
        /// Output shape
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Number of worker threads
        #[arg(long, default_value = "1")]
        workers: NonZeroUsize,
        /// Use the R-tree ward index instead of testing every ward
        #[arg(long)]
        indexed: bool,
    },
    /// Print the reports inside a map viewport
    Region {
        /// JSON array of reports
        #[arg(long)]
        reports: PathBuf,
        /// Viewport as `west,south,east,north`
        #[arg(
            long,
            allow_hyphen_values = true,
            conflicts_with_all = ["lat", "lng", "lat_delta", "lng_delta"]
        )]
        bbox: Option<String>,
        /// Viewport center latitude
        #[arg(long, allow_negative_numbers = true, required_unless_present = "bbox")]
        lat: Option<f64>,
        /// Viewport center longitude
        #[arg(long, allow_negative_numbers = true, required_unless_present = "bbox")]
        lng: Option<f64>,
        /// Full latitude span of the viewport
        #[arg(long, required_unless_present = "bbox")]
        lat_delta: Option<f64>,
        /// Full longitude span of the viewport
        #[arg(long, required_unless_present = "bbox")]
        lng_delta: Option<f64>,
    },
    /// Print one weighted point per report
    Heat {
        /// JSON array of reports
        #[arg(long)]
        reports: PathBuf,
        /// Weight config file (TOML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Flat ward aggregate records
    Json,
    /// `GeoJSON` `FeatureCollection` of ward polygons
    Geojson,
}

/// One line of the `wards` summary.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WardSummary<'a> {
    name: &'a str,
    vertex_count: usize,
    centroid: Coordinate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Wards { wards, fields } => {
            let fields = load_fields(fields.as_deref())?;
            let sink = CountingSink::new();
            let wards = load_wards(&wards, &fields, &sink)?;

            let summary: Vec<WardSummary<'_>> = wards
                .iter()
                .map(|w| WardSummary {
                    name: &w.name,
                    vertex_count: w.boundary.len(),
                    centroid: w.centroid,
                })
                .collect();
            print_json(&serde_json::json!({
                "kept": wards.len(),
                "dropped": sink.count(ElementKind::Ward),
                "wards": summary,
            }))?;
        }
        Commands::Aggregate {
            wards,
            fields,
            reports,
            config,
            category,
            format,
            workers,
            indexed,
        } => {
            let fields = load_fields(fields.as_deref())?;
            let sink = CountingSink::new();
            let wards = load_wards(&wards, &fields, &sink)?;
            let mut reports = read_reports(&reports, &sink)?;
            if let Some(category) = category {
                reports = filter_category(&reports, category);
                log::info!("{} reports in category {category}", reports.len());
            }
            let config = load_config(config.as_deref()).await;

            let aggregates = if indexed {
                let index = WardIndex::new(wards);
                aggregate_parallel(&reports, &index, &config, workers, &sink)
            } else {
                aggregate_parallel(&reports, wards.as_slice(), &config, workers, &sink)
            };
            log_drops(&sink);

            match format {
                OutputFormat::Json => print_json(&to_records(&aggregates))?,
                OutputFormat::Geojson => print_json(&to_feature_collection(&aggregates))?,
            }
        }
        Commands::Region {
            reports,
            bbox,
            lat,
            lng,
            lat_delta,
            lng_delta,
        } => {
            let region = resolve_region(bbox.as_deref(), lat, lng, lat_delta, lng_delta)?;
            let sink = CountingSink::new();
            let reports = read_reports(&reports, &sink)?;
            log_drops(&sink);

            let inside = filter_in_region(&reports, &region);
            log::info!("{} of {} reports inside viewport", inside.len(), reports.len());
            print_json(&inside)?;
        }
        Commands::Heat { reports, config } => {
            let sink = CountingSink::new();
            let reports = read_reports(&reports, &sink)?;
            log_drops(&sink);
            let config = load_config(config.as_deref()).await;
            print_json(&heat_points(&reports, &config))?;
        }
    }

    Ok(())
}

fn parse_category(s: &str) -> Result<IssueCategory, String> {
    s.parse().map_err(|_| {
        format!("unknown category {s:?}, expected garbage, sewage, burning, pollution or other")
    })
}

/// Reads a ward field mapping, or the default mapping when no file is
/// given.
fn load_fields(path: Option<&Path>) -> Result<WardFieldMapping, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(WardFieldMapping::default());
    };
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

/// Fetches the weight config once through a cache, so a missing or broken
/// file degrades to the built-in defaults with a warning.
async fn load_config(path: Option<&Path>) -> Arc<WeightConfig> {
    match path {
        Some(path) => ConfigCache::new(FileSource::new(path)).get_config().await,
        None => {
            ConfigCache::new(StaticSource::default())
                .get_config()
                .await
        }
    }
}

/// Builds the query viewport from either `--bbox` or center and spans.
fn resolve_region(
    bbox: Option<&str>,
    lat: Option<f64>,
    lng: Option<f64>,
    lat_delta: Option<f64>,
    lng_delta: Option<f64>,
) -> Result<Region, Box<dyn std::error::Error>> {
    if let Some(bbox) = bbox {
        let bbox = BoundingBox::parse(bbox)
            .ok_or_else(|| format!("invalid --bbox {bbox:?}, expected west,south,east,north"))?;
        return Ok(Region::from_bounding_box(&bbox));
    }

    match (lat, lng, lat_delta, lng_delta) {
        (Some(lat), Some(lng), Some(lat_delta), Some(lng_delta)) => Ok(Region::new(
            Coordinate::new(lat, lng),
            lat_delta,
            lng_delta,
        )),
        _ => Err("--bbox or all of --lat, --lng, --lat-delta and --lng-delta is required".into()),
    }
}

fn log_drops(sink: &CountingSink) {
    let wards = sink.count(ElementKind::Ward);
    let reports = sink.count(ElementKind::Report);
    if wards > 0 || reports > 0 {
        log::warn!(
            "Dropped {wards} ward features and {reports} reports (RUST_LOG=debug for details)"
        );
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
