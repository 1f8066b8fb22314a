/// National Gas Data Portal Client
///
/// Downloads the GB storage series ("Opening Stock" and "Available
/// Capacity") from the National Gas find-gas-data download endpoint as CSV
/// and parses each body into a `RawTable`.
///
/// Endpoint: https://data.nationalgas.com/api/find-gas-data-download

use std::time::Duration;

use chrono::{Months, NaiveDate};

use crate::dev_mode::DevMode;
use crate::facilities::publication_ids;
use crate::logging::{self, Stage};
use crate::model::{Metric, RawRecord, RawTable, Result, StorageError};

const DOWNLOAD_PATH: &str = "/api/find-gas-data-download";

pub const COL_DATA_ITEM: &str = "Data Item";
pub const COL_APPLICABLE_FOR: &str = "Applicable For";
pub const COL_APPLICABLE_AT: &str = "Applicable At";
pub const COL_VALUE: &str = "Value";
pub const COL_GENERATED_TIME: &str = "Generated Time";
pub const COL_QUALITY_INDICATOR: &str = "Quality Indicator";

// ============================================================================
// Date window
// ============================================================================

/// Inclusive gas-day range requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// The `years`-long window ending on `today`. A 29 February start is
    /// clamped to the 28th.
    pub fn ending_at(today: NaiveDate, years: u32) -> Self {
        let from = today
            .checked_sub_months(Months::new(12 * years))
            .unwrap_or(NaiveDate::MIN);
        DateWindow { from, to: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Builds a blocking client with the per-request timeout applied.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Builds the CSV download URL for one metric over a date window.
pub fn build_download_url(base_url: &str, metric: Metric, window: &DateWindow) -> String {
    format!(
        "{}{}?applicableFor=Y&dateFrom={}&dateTo={}&dateType=GASDAY&latestFlag=N&ids={}&type=CSV",
        base_url.trim_end_matches('/'),
        DOWNLOAD_PATH,
        window.from.format("%Y-%m-%d"),
        window.to.format("%Y-%m-%d"),
        publication_ids(metric).join(",")
    )
}

/// Downloads the raw CSV body for one metric.
///
/// # Errors
/// - `Network` if the request cannot be sent
/// - `Timeout` if it exceeds the client timeout
/// - `HttpStatus` on a non-2xx response
pub fn fetch_body(
    client: &reqwest::blocking::Client,
    base_url: &str,
    metric: Metric,
    window: &DateWindow,
) -> Result<String> {
    let url = build_download_url(base_url, metric, window);
    logging::debug(Stage::Fetch, Some(metric.label()), &format!("GET {}", url));

    let response = client.get(&url).send()?;

    if !response.status().is_success() {
        return Err(StorageError::HttpStatus(response.status().as_u16()));
    }

    Ok(response.text()?)
}

/// Downloads and parses one metric.
///
/// Fails as `fetch_body` does, or with `Parse` / `DataShape` if the body is
/// not the expected CSV.
pub fn fetch_metric(
    client: &reqwest::blocking::Client,
    base_url: &str,
    metric: Metric,
    window: &DateWindow,
) -> Result<RawTable> {
    let body = fetch_body(client, base_url, metric, window)?;
    parse_download_csv(&body, metric)
}

/// Downloads both metrics, one after the other. The first failure aborts.
///
/// When `archive` is given, each body is saved there before parsing so the
/// run can be replayed offline.
pub fn fetch_all(
    client: &reqwest::blocking::Client,
    base_url: &str,
    window: &DateWindow,
    archive: Option<&DevMode>,
) -> Result<Vec<RawTable>> {
    let mut tables = Vec::with_capacity(Metric::ALL.len());

    for metric in Metric::ALL {
        let body = fetch_body(client, base_url, metric, window)?;
        if let Some(archive) = archive {
            let path = archive.save_download(metric, &body)?;
            logging::debug(
                Stage::Fetch,
                Some(metric.label()),
                &format!("saved to {}", path.display()),
            );
        }

        let table = parse_download_csv(&body, metric)?;
        logging::info(
            Stage::Fetch,
            Some(metric.label()),
            &format!(
                "{} rows for {} to {}",
                table.records.len(),
                window.from,
                window.to
            ),
        );
        tables.push(table);
    }

    Ok(tables)
}

// ============================================================================
// CSV parsing
// ============================================================================

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn required_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    column_index(headers, name)
        .ok_or_else(|| StorageError::DataShape(format!("missing column {:?}", name)))
}

fn optional_field(record: &csv::StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a download body into a raw table.
///
/// An empty Value is kept as `None`; a non-numeric Value is a parse
/// error.
pub fn parse_download_csv(body: &str, metric: Metric) -> Result<RawTable> {
    let body = body.trim_start_matches('\u{feff}');
    if body.trim().is_empty() {
        return Err(StorageError::Parse("empty response body".into()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let data_item_idx = required_column(&headers, COL_DATA_ITEM)?;
    let applicable_for_idx = required_column(&headers, COL_APPLICABLE_FOR)?;
    let value_idx = required_column(&headers, COL_VALUE)?;
    let applicable_at_idx = column_index(&headers, COL_APPLICABLE_AT);
    let generated_idx = column_index(&headers, COL_GENERATED_TIME);
    let quality_idx = column_index(&headers, COL_QUALITY_INDICATOR);

    let mut records = Vec::new();
    let mut blank = 0usize;

    for (line, result) in reader.records().enumerate() {
        let record = result?;

        let raw_value = record.get(value_idx).unwrap_or("").trim();
        let value = if raw_value.is_empty() {
            blank += 1;
            None
        } else {
            Some(raw_value.parse::<f64>().map_err(|_| {
                StorageError::Parse(format!("row {}: value {:?} is not numeric", line + 1, raw_value))
            })?)
        };

        records.push(RawRecord {
            data_item: record.get(data_item_idx).unwrap_or("").trim().to_string(),
            applicable_for: record.get(applicable_for_idx).unwrap_or("").trim().to_string(),
            applicable_at: optional_field(&record, applicable_at_idx),
            value,
            generated_time: optional_field(&record, generated_idx),
            quality_indicator: optional_field(&record, quality_idx),
        });
    }

    if blank > 0 {
        logging::debug(
            Stage::Fetch,
            Some(metric.label()),
            &format!("{} rows have no value", blank),
        );
    }

    Ok(RawTable { metric, records })
}

// ============================================================================
// Tests
// ============================================================================
