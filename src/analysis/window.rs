/// Date window and staleness checks on cleaned data.
///
/// The portal publishes one opening-stock and one capacity figure per
/// facility per gas day. A facility whose latest figure is several days old
/// usually means the publication feed has stalled, which would leave a
/// silent gap at the right edge of the chart.
///
/// # Clock injection
/// Functions take `today: NaiveDate` rather than reading the clock, so the
/// checks are deterministic in tests.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::ingest::national_gas::DateWindow;
use crate::model::{Metric, MetricTable};

// ---------------------------------------------------------------------------
// Window check
// ---------------------------------------------------------------------------

/// Number of rows whose gas day lies outside the requested window.
pub fn rows_outside_window(tables: &[MetricTable], window: &DateWindow) -> usize {
    tables
        .iter()
        .flat_map(|t| t.rows.iter())
        .filter(|row| !window.contains(row.applicable_for))
        .count()
}

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Returns `true` if `latest` is more than `max_age_days` before `today`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_days  →  stale
///   age == max_age_days →  not stale
pub fn is_stale_at(latest: NaiveDate, max_age_days: i64, today: NaiveDate) -> bool {
    (today - latest).num_days() > max_age_days
}

/// Latest published gas day for one facility series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityFreshness {
    pub metric: Metric,
    pub data_item: String,
    pub latest: NaiveDate,
    pub age_days: i64,
}

/// Latest gas day per data item, sorted by label.
pub fn latest_by_series(table: &MetricTable, today: NaiveDate) -> Vec<FacilityFreshness> {
    let mut latest: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    for row in &table.rows {
        latest
            .entry(row.data_item.as_str())
            .and_modify(|d| *d = (*d).max(row.applicable_for))
            .or_insert(row.applicable_for);
    }

    latest
        .into_iter()
        .map(|(item, day)| FacilityFreshness {
            metric: table.metric,
            data_item: item.to_string(),
            latest: day,
            age_days: (today - day).num_days(),
        })
        .collect()
}

/// Series across all tables whose latest figure is stale.
pub fn stale_series_at(
    tables: &[MetricTable],
    max_age_days: i64,
    today: NaiveDate,
) -> Vec<FacilityFreshness> {
    tables
        .iter()
        .flat_map(|t| latest_by_series(t, today))
        .filter(|f| is_stale_at(f.latest, max_age_days, today))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetricRow;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A fixed "today" used across all tests: 2024-05-01.
    fn fixed_today() -> NaiveDate {
        day(2024, 5, 1)
    }

    fn table(rows: &[(&str, NaiveDate)]) -> MetricTable {
        MetricTable {
            metric: Metric::OpeningStock,
            rows: rows
                .iter()
                .map(|(item, d)| MetricRow {
                    data_item: item.to_string(),
                    label: None,
                    applicable_for: *d,
                    value: Some(1.0),
                })
                .collect(),
        }
    }

    #[test]
    fn test_exactly_at_threshold_is_not_stale() {
        assert!(!is_stale_at(day(2024, 4, 24), 7, fixed_today()));
    }

    #[test]
    fn test_one_day_past_threshold_is_stale() {
        assert!(is_stale_at(day(2024, 4, 23), 7, fixed_today()));
    }

    #[test]
    fn test_rows_outside_window() {
        let window = DateWindow::ending_at(fixed_today(), 2);
        let tables = vec![table(&[
            ("a", day(2022, 4, 30)),
            ("a", day(2022, 5, 1)),
            ("a", day(2024, 5, 1)),
            ("a", day(2024, 5, 2)),
        ])];
        assert_eq!(rows_outside_window(&tables, &window), 2);
    }

    #[test]
    fn test_latest_by_series_takes_max_date() {
        let t = table(&[
            ("Rough", day(2024, 4, 30)),
            ("Rough", day(2024, 4, 28)),
            ("Hornsea", day(2024, 4, 1)),
        ]);
        let latest = latest_by_series(&t, fixed_today());
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].data_item, "Hornsea");
        assert_eq!(latest[0].age_days, 30);
        assert_eq!(latest[1].latest, day(2024, 4, 30));
    }

    #[test]
    fn test_stale_series_only_reports_old_feeds() {
        let tables = vec![table(&[
            ("Rough", day(2024, 4, 30)),
            ("Hornsea", day(2024, 4, 1)),
        ])];
        let stale = stale_series_at(&tables, 7, fixed_today());
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].data_item, "Hornsea");
    }
}
