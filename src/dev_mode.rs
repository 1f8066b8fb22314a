/// Development mode utilities for working with saved downloads
///
/// When the National Gas portal is unavailable, or to iterate on the chart
/// without hitting the API, use this module to replay CSV files saved from
/// earlier downloads. Files go through the same parser as live responses.
///
/// Expected layout:
///   <dir>/opening_stock.csv
///   <dir>/available_capacity.csv

use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::national_gas::parse_download_csv;
use crate::logging::{self, Stage};
use crate::model::{Metric, RawTable, Result, StorageError};

/// Configuration for replaying saved downloads
pub struct DevMode {
    /// Directory holding one CSV per metric
    pub replay_dir: PathBuf,
}

impl DevMode {
    /// Create a new dev mode configuration
    ///
    /// # Arguments
    /// * `replay_dir` - Directory containing saved downloads
    pub fn new(replay_dir: impl Into<PathBuf>) -> Self {
        Self {
            replay_dir: replay_dir.into(),
        }
    }

    /// Path of the saved download for a metric
    pub fn file_for(&self, metric: Metric) -> PathBuf {
        self.replay_dir.join(format!("{}.csv", metric.file_stem()))
    }

    /// Load one saved download as if it had just been fetched
    pub fn load_metric(&self, metric: Metric) -> Result<RawTable> {
        let path = self.file_for(metric);
        let body = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("{}: {}", path.display(), e)))?;

        let table = parse_download_csv(&body, metric)?;
        logging::info(
            Stage::Fetch,
            Some(metric.label()),
            &format!("replayed {} rows from {}", table.records.len(), path.display()),
        );
        Ok(table)
    }

    /// Load every metric, in fetch order
    pub fn load_all(&self) -> Result<Vec<RawTable>> {
        Metric::ALL.into_iter().map(|m| self.load_metric(m)).collect()
    }

    /// Save a response body so it can be replayed later
    pub fn save_download(&self, metric: Metric, body: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.replay_dir)?;
        let path = self.file_for(metric);
        fs::write(&path, body)?;
        Ok(path)
    }

    /// Whether every metric has a saved download
    pub fn is_complete(dir: &Path) -> bool {
        let dev = DevMode::new(dir);
        Metric::ALL.into_iter().all(|m| dev.file_for(m).is_file())
    }
}
