//! Raw table cleaning.
//!
//! Turns a downloaded `RawTable` into a `MetricTable`: day-first dates are
//! parsed, labels are parsed into `FacilityLabel`s, duplicate
//! (data item, gas day) rows are dropped keeping the first, and the columns
//! the chart never reads (generation time, quality flag, applicable-at) are
//! discarded.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::logging::{self, Stage};
use crate::model::{FacilityLabel, MetricRow, MetricTable, RawTable, Result, StorageError};

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
];

/// Parses a day-first date, ignoring any time of day.
///
/// `"01/02/2024"` is 1 February. ISO dates are accepted too.
pub fn parse_day_first(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Drops rows repeating an earlier (data item, gas day) pair. Returns the
/// number of rows removed; a second pass always removes zero.
pub fn dedup_rows(table: &mut MetricTable) -> usize {
    let before = table.rows.len();
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::with_capacity(before);
    table
        .rows
        .retain(|row| seen.insert((row.data_item.clone(), row.applicable_for)));
    before - table.rows.len()
}

/// Cleans one downloaded table.
///
/// # Errors
/// `Parse` if an "Applicable For" or "Applicable At" value is not a date.
pub fn clean_table(raw: RawTable) -> Result<MetricTable> {
    let metric = raw.metric;
    let mut rows = Vec::with_capacity(raw.records.len());

    for record in raw.records {
        let applicable_for = parse_day_first(&record.applicable_for).ok_or_else(|| {
            StorageError::Parse(format!(
                "{:?} in \"Applicable For\" is not a date",
                record.applicable_for
            ))
        })?;

        if let Some(at) = &record.applicable_at {
            if parse_day_first(at).is_none() {
                return Err(StorageError::Parse(format!(
                    "{:?} in \"Applicable At\" is not a date",
                    at
                )));
            }
        }

        let label = FacilityLabel::parse(&record.data_item, metric);
        rows.push(MetricRow {
            data_item: record.data_item,
            label,
            applicable_for,
            value: record.value,
        });
    }

    let mut table = MetricTable { metric, rows };
    let removed = dedup_rows(&mut table);
    if removed > 0 {
        logging::debug(
            Stage::Clean,
            Some(metric.label()),
            &format!("dropped {} duplicate rows", removed),
        );
    }

    Ok(table)
}

/// Cleans every downloaded table, preserving order.
pub fn clean_all(raw: Vec<RawTable>) -> Result<Vec<MetricTable>> {
    raw.into_iter().map(clean_table).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::national_gas::parse_download_csv;
    use crate::model::{Metric, RawRecord, StorageCategory};

    fn record(item: &str, day: &str, value: f64) -> RawRecord {
        RawRecord {
            data_item: item.to_string(),
            applicable_for: day.to_string(),
            applicable_at: Some(format!("{} 05:00:00", day)),
            value: Some(value),
            generated_time: Some("01/05/2024 05:00:00".to_string()),
            quality_indicator: Some("A".to_string()),
        }
    }

    const ROUGH: &str = "Opening Stock, Rough, Long Range Storage";

    #[test]
    fn test_parse_day_first() {
        assert_eq!(parse_day_first("01/02/2024"), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(parse_day_first("13/12/2023 05:00:00"), NaiveDate::from_ymd_opt(2023, 12, 13));
        assert_eq!(parse_day_first("2024-02-01"), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(parse_day_first("31/02/2024"), None);
        assert_eq!(parse_day_first("yesterday"), None);
    }

    #[test]
    fn test_clean_keeps_first_duplicate() {
        let raw = RawTable {
            metric: Metric::OpeningStock,
            records: vec![
                record(ROUGH, "01/01/2024", 100.0),
                record(ROUGH, "01/01/2024", 999.0),
                record(ROUGH, "02/01/2024", 200.0),
            ],
        };

        let table = clean_table(raw).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].value, Some(100.0), "first occurrence wins");
        assert_eq!(table.rows[1].value, Some(200.0));
    }

    #[test]
    fn test_blank_first_revision_wins_over_later_value() {
        let body = format!(
            "Applicable For,Data Item,Value\n01/01/2024,\"{}\",\n01/01/2024,\"{}\",5\n",
            ROUGH, ROUGH
        );
        let raw = parse_download_csv(&body, Metric::OpeningStock).unwrap();

        let table = clean_table(raw).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].value, None, "the blank first revision is kept");
    }

    #[test]
    fn test_clean_output_is_unique_on_key() {
        let raw = RawTable {
            metric: Metric::OpeningStock,
            records: vec![
                record(ROUGH, "01/01/2024", 1.0),
                record("Opening Stock, Hornsea, Medium Range Storage", "01/01/2024", 2.0),
                record(ROUGH, "01/01/2024", 3.0),
                record("Opening Stock, Hornsea, Medium Range Storage", "01/01/2024", 4.0),
            ],
        };
        let table = clean_table(raw).unwrap();
        let keys: HashSet<(String, NaiveDate)> = table
            .rows
            .iter()
            .map(|r| (r.data_item.clone(), r.applicable_for))
            .collect();
        assert_eq!(keys.len(), table.rows.len());
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let raw = RawTable {
            metric: Metric::OpeningStock,
            records: vec![record(ROUGH, "01/01/2024", 1.0), record(ROUGH, "01/01/2024", 1.0)],
        };
        let mut table = clean_table(raw).unwrap();
        let snapshot = table.clone();
        assert_eq!(dedup_rows(&mut table), 0);
        assert_eq!(table, snapshot);
    }

    #[test]
    fn test_clean_parses_labels_once() {
        let raw = RawTable {
            metric: Metric::OpeningStock,
            records: vec![
                record(ROUGH, "01/01/2024", 1.0),
                record("Opening Stock, Elsewhere, Unknown Storage", "01/01/2024", 1.0),
            ],
        };
        let table = clean_table(raw).unwrap();
        let label = table.rows[0].label.as_ref().unwrap();
        assert_eq!(label.category, StorageCategory::LongRange);
        assert_eq!(label.facility, "Rough");
        assert!(table.rows[1].label.is_none());
    }

    #[test]
    fn test_bad_applicable_for_is_parse_error() {
        let raw = RawTable {
            metric: Metric::OpeningStock,
            records: vec![record(ROUGH, "not a day", 1.0)],
        };
        assert!(matches!(clean_table(raw), Err(StorageError::Parse(_))));
    }

    #[test]
    fn test_bad_applicable_at_is_parse_error() {
        let mut bad = record(ROUGH, "01/01/2024", 1.0);
        bad.applicable_at = Some("soon".to_string());
        let raw = RawTable { metric: Metric::OpeningStock, records: vec![bad] };
        assert!(matches!(clean_table(raw), Err(StorageError::Parse(_))));
    }
}
