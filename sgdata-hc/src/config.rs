//! Configuration for the hawker closure processor
//!
//! Settings are layered as:
//! 1. Command-line arguments / environment variables (via clap)
//! 2. TOML configuration file (`sgdata.toml` or `--config`)
//! 3. Built-in defaults (code constants)

use crate::calendar::DEFAULT_TIMEZONE;
use serde::Deserialize;
use sgdata_common::config::{load_toml_config, LoggingConfig};
use sgdata_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_CACHE_FILE: &str = "cache.json";
pub const DEFAULT_RADIUS_KM: f64 = 2.0;
pub const DEFAULT_BASE_URL: &str = "https://data.gov.sg";
pub const DEFAULT_DATASET_ID: &str = "d_bda4baa634dd1cc7a6c7cad5f19e2d68";
pub const DEFAULT_STATIONS_URL: &str =
    "https://github.com/cheeaun/sgraildata/raw/refs/heads/master/data/v1/sg-rail.geojson";

/// Contents of the TOML configuration file
///
/// Every key is optional; missing keys fall back to built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    #[serde(default)]
    pub cache_enabled: Option<bool>,

    /// Clustering radius around each station
    #[serde(default)]
    pub radius_km: Option<f64>,

    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub stations: StationsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Closure dataset location and paging
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_dataset_id")]
    pub dataset_id: String,

    /// Records requested per page
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Upper bound on pages followed in one run
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dataset_id: default_dataset_id(),
            page_limit: default_page_limit(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Station dataset location
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationsConfig {
    #[serde(default = "default_stations_url")]
    pub url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            url: default_stations_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_dataset_id() -> String {
    DEFAULT_DATASET_ID.to_string()
}

fn default_page_limit() -> u32 {
    1000
}

fn default_max_pages() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_stations_url() -> String {
    DEFAULT_STATIONS_URL.to_string()
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub cache_file: Option<PathBuf>,
    /// Disable the response cache for this run
    pub no_cache: bool,
    pub radius_km: Option<f64>,
    pub log_level: Option<String>,
}

/// Fully resolved processor configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub cache_file: PathBuf,
    pub cache_enabled: bool,
    pub radius_km: f64,
    pub timezone: String,
    pub source: SourceConfig,
    pub stations: StationsConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            cache_enabled: true,
            radius_km: DEFAULT_RADIUS_KM,
            timezone: DEFAULT_TIMEZONE.to_string(),
            source: SourceConfig::default(),
            stations: StationsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load the TOML file at `path` (if any) and apply `overrides`
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config: TomlConfig = load_toml_config(path)?;
        Self::resolve(toml_config, overrides)
    }

    /// Merge file values with overrides, then validate
    pub fn resolve(toml_config: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let mut logging = toml_config.logging;
        if let Some(level) = overrides.log_level {
            logging.level = level;
        }

        let config = Self {
            output_dir: overrides
                .output_dir
                .or(toml_config.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            cache_file: overrides
                .cache_file
                .or(toml_config.cache_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE)),
            cache_enabled: !overrides.no_cache && toml_config.cache_enabled.unwrap_or(true),
            radius_km: overrides
                .radius_km
                .or(toml_config.radius_km)
                .unwrap_or(DEFAULT_RADIUS_KM),
            timezone: toml_config
                .timezone
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            source: toml_config.source,
            stations: toml_config.stations,
            logging,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            return Err(Error::Config(format!(
                "radius_km must be a non-negative number, got {}",
                self.radius_km
            )));
        }
        if self.source.page_limit == 0 {
            return Err(Error::Config("source.page_limit must be greater than 0".to_string()));
        }
        if self.source.max_pages == 0 {
            return Err(Error::Config("source.max_pages must be greater than 0".to_string()));
        }
        if self.source.dataset_id.trim().is_empty() {
            return Err(Error::Config("source.dataset_id must not be empty".to_string()));
        }
        if self.timezone.trim().is_empty() {
            return Err(Error::Config("timezone must not be empty".to_string()));
        }
        self.logging.validate()
    }

    /// Log the effective settings
    pub fn log_summary(&self) {
        info!(
            output_dir = %self.output_dir.display(),
            cache_file = %self.cache_file.display(),
            cache_enabled = self.cache_enabled,
            radius_km = self.radius_km,
            dataset = %self.source.dataset_id,
            "Effective configuration"
        );
    }
}
