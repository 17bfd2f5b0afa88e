#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Weight configuration sources and a TTL cache in front of them.
//!
//! The heatmap pipeline reads its
//! [`WeightConfig`](civic_map_heatmap_models::WeightConfig) through a
//! [`ConfigCache`]. The cache refetches from its [`ConfigSource`] once the
//! cached value's TTL has passed and never fails: if the source is slow,
//! unreachable or returns a bad document, callers get the last good value
//! (or the built-in default if there has never been one).

pub mod cache;
pub mod clock;
pub mod source;

use std::time::Duration;

use civic_map_heatmap_models::ConfigValidationError;

pub use cache::{CacheState, ConfigCache, DEFAULT_FETCH_TIMEOUT};
pub use clock::{Clock, ManualClock, SystemClock};
pub use source::{ConfigFormat, ConfigSource, FileSource, StaticSource, parse_config};

/// Errors that can occur while fetching a weight configuration.
///
/// These never reach [`ConfigCache::get_config`] callers; the cache logs
/// them and falls back.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The document parsed but holds unusable values.
    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigValidationError),

    /// The source did not answer in time.
    #[error("Config fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The source is unavailable for another reason.
    #[error("Config source unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },
}
