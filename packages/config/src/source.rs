//! Where weight configurations come from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use civic_map_heatmap_models::WeightConfig;

use crate::ConfigError;

/// An external store holding the current [`WeightConfig`].
///
/// Fetches are expected to be cheap to retry; the cache calls
/// [`ConfigSource::fetch`] on every stale read until one succeeds.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Human-readable name used in log lines.
    fn name(&self) -> &str;

    /// Reads the current configuration.
    ///
    /// Missing fields take their default values. Range checks happen in
    /// the cache, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the store cannot be read or the document
    /// cannot be decoded.
    async fn fetch(&self) -> Result<WeightConfig, ConfigError>;
}

/// Serialization format of a config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML document.
    Toml,
    /// JSON object.
    Json,
}

impl ConfigFormat {
    /// Picks the format from a file extension. Anything other than
    /// `.json` is read as TOML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Decodes a config document.
///
/// # Errors
///
/// Returns [`ConfigError::Json`] or [`ConfigError::Toml`] if the document
/// does not decode as a [`WeightConfig`].
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<WeightConfig, ConfigError> {
    Ok(match format {
        ConfigFormat::Json => serde_json::from_str(contents)?,
        ConfigFormat::Toml => toml::from_str(contents)?,
    })
}

/// Reads the config from a file on every fetch, so edits are picked up on
/// the next refresh.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: ConfigFormat,
    name: String,
}

impl FileSource {
    /// Creates a source for `path`, with the format taken from its
    /// extension.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ConfigFormat::from_path(&path);
        Self::with_format(path, format)
    }

    /// Creates a source for `path` with an explicit format.
    #[must_use]
    pub fn with_format(path: impl Into<PathBuf>, format: ConfigFormat) -> Self {
        let path = path.into();
        let name = format!("file {}", path.display());
        Self { path, format, name }
    }

    /// The file this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<WeightConfig, ConfigError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        parse_config(&contents, self.format)
    }
}

/// Always returns the same configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    config: WeightConfig,
}

impl StaticSource {
    /// Creates a source serving `config`.
    #[must_use]
    pub const fn new(config: WeightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self) -> Result<WeightConfig, ConfigError> {
        Ok(self.config.clone())
    }
}
