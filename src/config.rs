//! Run configuration.
//!
//! Every field has a default, so a run with no config file reproduces the
//! published chart. A TOML file (named by `GB_STORAGE_CONFIG` or the
//! `--config` flag) can override any section, and `GB_STORAGE_API_URL`
//! overrides the API host, e.g. to point at a local mirror.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::model::{Result, StorageError};

pub const CONFIG_PATH_ENV: &str = "GB_STORAGE_CONFIG";
pub const API_URL_ENV: &str = "GB_STORAGE_API_URL";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub lookback_years: u32,
    /// Series whose latest gas day is older than this are reported as stale.
    pub stale_after_days: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data.nationalgas.com".to_string(),
            timeout_secs: 12,
            lookback_years: 2,
            stale_after_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub title: String,
    pub subtitle: String,
    /// Bar and line colour, `#rrggbb`.
    pub color: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "UK: Gas Storage".to_string(),
            subtitle: "Twh".to_string(),
            color: "#216c8f".to_string(),
            width: 1500,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to write the figure as JSON.
    pub figure_json: Option<PathBuf>,
    /// Where to write the rendered chart; `.svg` or `.png`.
    pub image: Option<PathBuf>,
    /// Replay saved downloads from this directory instead of the API.
    pub replay_dir: Option<PathBuf>,
    /// Save each live download here so it can be replayed later.
    pub archive_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn log_level(&self) -> Result<LogLevel> {
        self.level.parse().map_err(StorageError::Config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub chart: ChartConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolves the configuration for a run: `.env` is loaded first, then
    /// the explicit path (or `GB_STORAGE_CONFIG`), then the API URL override.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match explicit_path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(StorageError::Config("api.base_url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(StorageError::Config("api.timeout_secs must be positive".into()));
        }
        if !(1..=10).contains(&self.api.lookback_years) {
            return Err(StorageError::Config(format!(
                "api.lookback_years must be between 1 and 10, got {}",
                self.api.lookback_years
            )));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(StorageError::Config("chart dimensions must be non-zero".into()));
        }
        parse_hex_color(&self.chart.color)?;
        self.logging.log_level()?;
        Ok(())
    }
}

/// Parses `#rrggbb` into its components.
pub fn parse_hex_color(color: &str) -> Result<(u8, u8, u8)> {
    let invalid = || StorageError::Config(format!("invalid colour {:?}, expected #rrggbb", color));

    let hex = color.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
