//! The reporting run: fetch → clean → split → chart.
//!
//! Every stage propagates its first error; there are no retries and no
//! partial figures.

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::cleaning::clean_all;
use crate::analysis::groupings::split_by_category;
use crate::analysis::window::{rows_outside_window, stale_series_at, FacilityFreshness};
use crate::chart::builder::{build_figure, ChartStyle};
use crate::chart::figure::Figure;
use crate::config::Config;
use crate::dev_mode::DevMode;
use crate::ingest::national_gas::{build_client, fetch_all, DateWindow};
use crate::logging::{self, Stage};
use crate::model::{RawTable, Result, StorageCategory, StorageError};

/// What happened to the data on its way to the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub rows_fetched: usize,
    pub rows_cleaned: usize,
    pub rows_charted: usize,
    pub unmatched_labels: Vec<String>,
    pub rows_unmatched: usize,
    pub rows_outside_window: usize,
    pub stale_series: Vec<FacilityFreshness>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub figure: Figure,
    pub summary: RunSummary,
}

/// Obtains the raw tables: replayed from `output.replay_dir` when set,
/// otherwise downloaded (and archived to `output.archive_dir` when set).
pub fn fetch_raw(config: &Config, window: &DateWindow) -> Result<Vec<RawTable>> {
    if let Some(dir) = &config.output.replay_dir {
        if !DevMode::is_complete(dir) {
            return Err(StorageError::Config(format!(
                "{} does not hold a saved download for every metric",
                dir.display()
            )));
        }
        return DevMode::new(dir).load_all();
    }

    let client = build_client(config.api.timeout_secs)?;
    let archive = config.output.archive_dir.as_ref().map(DevMode::new);
    fetch_all(&client, &config.api.base_url, window, archive.as_ref())
}

/// Cleans, splits and charts already-fetched tables.
pub fn build_from_raw(
    raw: Vec<RawTable>,
    window: &DateWindow,
    config: &Config,
    today: NaiveDate,
) -> Result<PipelineOutput> {
    let rows_fetched = raw.iter().map(|t| t.records.len()).sum();

    let tables = clean_all(raw)?;
    let rows_cleaned = tables.iter().map(|t| t.rows.len()).sum();
    logging::info(
        Stage::Clean,
        None,
        &format!("{} of {} rows kept", rows_cleaned, rows_fetched),
    );

    let outside = rows_outside_window(&tables, window);
    if outside > 0 {
        logging::warn(
            Stage::Clean,
            None,
            &format!("{} rows fall outside {} to {}", outside, window.from, window.to),
        );
    }

    let stale = stale_series_at(&tables, i64::from(config.api.stale_after_days), today);
    for series in &stale {
        logging::warn(
            Stage::Clean,
            Some(&series.data_item),
            &format!("latest gas day {} is {} days old", series.latest, series.age_days),
        );
    }

    let split = split_by_category(&tables);
    for category in StorageCategory::ALL {
        let rows = split.group(category).map_or(0, |g| g.rows.len());
        logging::debug(Stage::Split, Some(category.label()), &format!("{} rows", rows));
    }
    let figure = build_figure(&split.groups, &ChartStyle::from(&config.chart));

    let summary = RunSummary {
        date_from: window.from,
        date_to: window.to,
        rows_fetched,
        rows_cleaned,
        rows_charted: split.grouped_rows(),
        unmatched_labels: split.unmatched_labels,
        rows_unmatched: split.unmatched_rows,
        rows_outside_window: outside,
        stale_series: stale,
    };
    logging::log_run_summary(summary.rows_fetched, summary.rows_charted, summary.rows_unmatched);

    Ok(PipelineOutput { figure, summary })
}

/// Runs the whole pipeline for the window ending `today`.
pub fn run(config: &Config, today: NaiveDate) -> Result<PipelineOutput> {
    let window = DateWindow::ending_at(today, config.api.lookback_years);
    let raw = fetch_raw(config, &window)?;
    build_from_raw(raw, &window, config, today)
}
