//! Data Source Verification Module
//!
//! Checks the live National Gas downloads against the facility registry to
//! determine whether each metric is reachable, which facilities are
//! reporting, and whether any label falls outside the known categories.
//!
//! Run this after the portal changes its publication objects, before
//! trusting a chart built from the new data.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::cleaning::clean_table;
use crate::config::Config;
use crate::facilities::{expected_labels, FACILITY_REGISTRY};
use crate::ingest::national_gas::{build_client, fetch_metric, DateWindow};
use crate::model::{Metric, MetricTable, Result};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricVerification {
    pub metric: String,
    pub status: VerificationStatus,
    pub api_responsive: bool,
    pub row_count: usize,
    pub facilities_reporting: Vec<String>,
    pub facilities_missing: Vec<String>,
    /// Registry labels for this metric that never appeared.
    pub labels_missing: Vec<String>,
    pub unmatched_labels: Vec<String>,
    pub latest_gas_day: Option<NaiveDate>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub results: Vec<MetricVerification>,
    pub summary: VerificationSummary,
}

// ============================================================================
// Table checks
// ============================================================================

fn failed(metric: Metric, error: String) -> MetricVerification {
    MetricVerification {
        metric: metric.label().to_string(),
        status: VerificationStatus::Failed,
        api_responsive: false,
        row_count: 0,
        facilities_reporting: Vec::new(),
        facilities_missing: Vec::new(),
        labels_missing: Vec::new(),
        unmatched_labels: Vec::new(),
        latest_gas_day: None,
        error_message: Some(error),
    }
}

/// Compares a cleaned table against the registry.
pub fn check_table(table: &MetricTable) -> MetricVerification {
    let mut reporting = BTreeSet::new();
    let mut unmatched = BTreeSet::new();
    let seen: BTreeSet<&str> = table.rows.iter().map(|r| r.data_item.as_str()).collect();

    for row in &table.rows {
        match &row.label {
            Some(label) => {
                reporting.insert(label.facility.clone());
            }
            None => {
                unmatched.insert(row.data_item.clone());
            }
        }
    }

    let missing: Vec<String> = FACILITY_REGISTRY
        .iter()
        .filter(|f| !reporting.contains(f.name))
        .map(|f| f.name.to_string())
        .collect();

    let labels_missing: Vec<String> = expected_labels(table.metric)
        .into_iter()
        .filter(|label| !seen.contains(label.as_str()))
        .collect();

    let status = if table.rows.is_empty() {
        VerificationStatus::Failed
    } else if missing.is_empty() && labels_missing.is_empty() && unmatched.is_empty() {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };

    MetricVerification {
        metric: table.metric.label().to_string(),
        status,
        api_responsive: true,
        row_count: table.rows.len(),
        facilities_reporting: reporting.into_iter().collect(),
        facilities_missing: missing,
        labels_missing,
        unmatched_labels: unmatched.into_iter().collect(),
        latest_gas_day: table.rows.iter().map(|r| r.applicable_for).max(),
        error_message: if table.rows.is_empty() {
            Some("No rows returned".to_string())
        } else {
            None
        },
    }
}

// ============================================================================
// Live verification
// ============================================================================

pub fn verify_metric(
    client: &reqwest::blocking::Client,
    base_url: &str,
    metric: Metric,
    window: &DateWindow,
) -> MetricVerification {
    let raw = match fetch_metric(client, base_url, metric, window) {
        Ok(raw) => raw,
        Err(e) => return failed(metric, format!("Download failed: {}", e)),
    };

    match clean_table(raw) {
        Ok(table) => check_table(&table),
        Err(e) => {
            let mut result = failed(metric, format!("Cleaning failed: {}", e));
            result.api_responsive = true;
            result
        }
    }
}

pub fn run_full_verification(config: &Config, today: NaiveDate) -> Result<VerificationReport> {
    let client = build_client(config.api.timeout_secs)?;
    let window = DateWindow::ending_at(today, config.api.lookback_years);

    let results: Vec<MetricVerification> = Metric::ALL
        .into_iter()
        .map(|metric| verify_metric(&client, &config.api.base_url, metric, &window))
        .collect();

    let failed_count = results
        .iter()
        .filter(|r| r.status == VerificationStatus::Failed)
        .count();

    Ok(VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        date_from: window.from,
        date_to: window.to,
        summary: VerificationSummary {
            total: results.len(),
            working: results.len() - failed_count,
            failed: failed_count,
        },
        results,
    })
}

pub fn print_report(report: &VerificationReport) {
    println!("\n🔍 National Gas storage downloads, {} to {}", report.date_from, report.date_to);
    println!("═══════════════════════════════════════════════════════════");

    for result in &report.results {
        match result.status {
            VerificationStatus::Success => {
                println!("  {} ... ✓ OK ({} rows)", result.metric, result.row_count)
            }
            VerificationStatus::PartialSuccess => println!(
                "  {} ... ⚠ Partial (missing: {:?}, labels missing: {:?}, unmatched: {:?})",
                result.metric, result.facilities_missing, result.labels_missing, result.unmatched_labels
            ),
            VerificationStatus::Failed => println!(
                "  {} ... ✗ FAILED: {}",
                result.metric,
                result.error_message.as_deref().unwrap_or("Unknown")
            ),
        }
    }

    println!("═══════════════════════════════════════════════════════════");
    println!(
        "Summary: {}/{} working, {} failed\n",
        report.summary.working, report.summary.total, report.summary.failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FacilityLabel, MetricRow};

    fn table_from(labels: &[String]) -> MetricTable {
        MetricTable {
            metric: Metric::OpeningStock,
            rows: labels
                .iter()
                .map(|item| MetricRow {
                    data_item: item.clone(),
                    label: FacilityLabel::parse(item, Metric::OpeningStock),
                    applicable_for: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
                    value: Some(1.0),
                })
                .collect(),
        }
    }

    #[test]
    fn test_complete_table_is_success() {
        let result = check_table(&table_from(&expected_labels(Metric::OpeningStock)));
        assert_eq!(result.status, VerificationStatus::Success);
        assert!(result.facilities_missing.is_empty());
        assert_eq!(result.facilities_reporting.len(), FACILITY_REGISTRY.len());
        assert_eq!(result.latest_gas_day, NaiveDate::from_ymd_opt(2024, 4, 30));
    }

    #[test]
    fn test_missing_facility_is_partial() {
        let labels: Vec<String> = expected_labels(Metric::OpeningStock)
            .into_iter()
            .filter(|l| !l.contains("Rough"))
            .collect();
        let result = check_table(&table_from(&labels));
        assert_eq!(result.status, VerificationStatus::PartialSuccess);
        assert_eq!(result.facilities_missing, vec!["Rough"]);
        assert_eq!(result.labels_missing, vec!["Opening Stock, Rough, Long Range Storage"]);
    }

    #[test]
    fn test_relabelled_facility_is_partial() {
        let labels: Vec<String> = expected_labels(Metric::OpeningStock)
            .into_iter()
            .map(|l| l.replace("Opening Stock, Hornsea", "Hornsea"))
            .collect();
        let result = check_table(&table_from(&labels));
        assert!(result.facilities_missing.is_empty());
        assert_eq!(result.labels_missing, vec!["Opening Stock, Hornsea, Medium Range Storage"]);
        assert_eq!(result.status, VerificationStatus::PartialSuccess);
    }

    #[test]
    fn test_unmatched_label_is_partial() {
        let mut labels = expected_labels(Metric::OpeningStock);
        labels.push("Opening Stock, Gateway, Floating Storage".to_string());
        let result = check_table(&table_from(&labels));
        assert_eq!(result.status, VerificationStatus::PartialSuccess);
        assert_eq!(result.unmatched_labels, vec!["Opening Stock, Gateway, Floating Storage"]);
    }

    #[test]
    fn test_empty_table_is_failed() {
        let result = check_table(&table_from(&[]));
        assert_eq!(result.status, VerificationStatus::Failed);
        assert!(result.error_message.is_some());
    }
}
