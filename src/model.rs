/// Core data types for the GB gas storage reporting service.
///
/// This module defines the shared domain model imported by all other modules:
/// metrics, storage categories, the structured facility label, the raw and
/// cleaned tables, and the crate-wide error type. It contains no I/O.

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Raw API quantities are kWh; the chart displays Twh.
pub const TWH_SCALE: f64 = 1e-9;

/// Converts a raw API value to Twh.
pub fn to_twh(raw: f64) -> f64 {
    raw * TWH_SCALE
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// One of the two published storage metrics. Each is fetched as its own
/// download and becomes its own `MetricTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Metric {
    OpeningStock,
    AvailableCapacity,
}

impl Metric {
    /// Fetch and draw order. The position doubles as the chart legend group.
    pub const ALL: [Metric; 2] = [Metric::OpeningStock, Metric::AvailableCapacity];

    /// The metric text as it appears inside an API "Data Item" label.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::OpeningStock => "Opening Stock",
            Metric::AvailableCapacity => "Available Capacity",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Metric::OpeningStock => 0,
            Metric::AvailableCapacity => 1,
        }
    }

    /// File stem used for saved downloads in offline replay.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Metric::OpeningStock => "opening_stock",
            Metric::AvailableCapacity => "available_capacity",
        }
    }

    /// Finds the metric named inside a label (case-sensitive substring).
    pub fn detect(data_item: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| data_item.contains(m.label()))
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Storage categories
// ---------------------------------------------------------------------------

/// Facility type; one chart panel per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StorageCategory {
    LongRange,
    MediumRange,
    LngImportation,
}

impl StorageCategory {
    /// Panel order, left to right.
    pub const ALL: [StorageCategory; 3] = [
        StorageCategory::LongRange,
        StorageCategory::MediumRange,
        StorageCategory::LngImportation,
    ];

    /// The category text as it appears inside an API "Data Item" label.
    pub fn label(&self) -> &'static str {
        match self {
            StorageCategory::LongRange => "Long Range Storage",
            StorageCategory::MediumRange => "Medium Range Storage",
            StorageCategory::LngImportation => "LNG Importation",
        }
    }

    pub fn panel_title(&self) -> &'static str {
        match self {
            StorageCategory::LongRange => "Long Range",
            StorageCategory::MediumRange => "Medium Range",
            StorageCategory::LngImportation => "LNG Importation",
        }
    }

    /// 1-based subplot column.
    pub fn column(&self) -> usize {
        match self {
            StorageCategory::LongRange => 1,
            StorageCategory::MediumRange => 2,
            StorageCategory::LngImportation => 3,
        }
    }

    /// Finds the category named inside a label. Matching is an exact,
    /// case-sensitive substring test against the API vocabulary.
    pub fn detect(data_item: &str) -> Option<StorageCategory> {
        StorageCategory::ALL
            .into_iter()
            .find(|c| data_item.contains(c.label()))
    }
}

impl std::fmt::Display for StorageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Facility label
// ---------------------------------------------------------------------------

/// Structured form of a "Data Item" label such as
/// `"Opening Stock, Rough, Long Range Storage"`.
///
/// Parsed once when a table is cleaned so that downstream grouping never has
/// to re-scan label strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FacilityLabel {
    pub metric: Metric,
    pub facility: String,
    pub category: StorageCategory,
}

impl FacilityLabel {
    /// Parses a label. `table_metric` is the metric of the download the row
    /// came from and is used when the label itself does not name one.
    ///
    /// Returns `None` when the label names none of the storage categories.
    pub fn parse(data_item: &str, table_metric: Metric) -> Option<Self> {
        let category = StorageCategory::detect(data_item)?;
        let metric = Metric::detect(data_item).unwrap_or(table_metric);

        let facility_parts: Vec<&str> = data_item
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter(|part| *part != metric.label() && !part.contains(category.label()))
            .collect();

        let facility = if facility_parts.is_empty() {
            data_item.trim().to_string()
        } else {
            facility_parts.join(", ")
        };

        Some(FacilityLabel {
            metric,
            facility,
            category,
        })
    }

    /// Rebuilds the canonical API label.
    pub fn data_item(&self) -> String {
        format!("{}, {}, {}", self.metric.label(), self.facility, self.category.label())
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// One row of a downloaded CSV, before cleaning. Date columns are still text
/// and the columns the chart never uses are still present.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub data_item: String,
    pub applicable_for: String,
    pub applicable_at: Option<String>,
    /// `None` when the Value cell is blank.
    pub value: Option<f64>,
    pub generated_time: Option<String>,
    pub quality_indicator: Option<String>,
}

/// A downloaded metric table as parsed from the CSV body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub metric: Metric,
    pub records: Vec<RawRecord>,
}

/// One cleaned observation: a facility's value on a gas day.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub data_item: String,
    /// `None` when the label matches no storage category.
    pub label: Option<FacilityLabel>,
    pub applicable_for: NaiveDate,
    /// `None` for a blank published value. Blank rows take part in
    /// de-duplication but are left out of bars and sums.
    pub value: Option<f64>,
}

/// A cleaned metric table. Unique on (data item, applicable for).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    pub metric: Metric,
    pub rows: Vec<MetricRow>,
}

/// All rows of one storage category, stock rows before capacity rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageGroupTable {
    pub category: StorageCategory,
    pub rows: Vec<MetricRow>,
}

impl StorageGroupTable {
    /// Rows of one metric, in table order.
    pub fn rows_for(&self, metric: Metric) -> impl Iterator<Item = &MetricRow> {
        self.rows
            .iter()
            .filter(move |row| row.label.as_ref().map(|l| l.metric) == Some(metric))
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can abort a reporting run.
#[derive(Debug, PartialEq)]
pub enum StorageError {
    /// The request could not be sent.
    Network(String),
    /// The request exceeded the client timeout.
    Timeout(String),
    /// Non-2xx HTTP response from the National Gas API.
    HttpStatus(u16),
    /// The response body is not valid CSV or a field has the wrong type.
    Parse(String),
    /// A column the pipeline needs is missing.
    DataShape(String),
    /// The configuration file or environment is invalid.
    Config(String),
    /// Reading saved downloads or writing output failed.
    Io(String),
    /// The chart could not be drawn.
    Render(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Network(msg) => write!(f, "Network error: {}", msg),
            StorageError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            StorageError::HttpStatus(code) => write!(f, "HTTP error: {}", code),
            StorageError::Parse(msg) => write!(f, "Parse error: {}", msg),
            StorageError::DataShape(msg) => write!(f, "Data shape error: {}", msg),
            StorageError::Config(msg) => write!(f, "Config error: {}", msg),
            StorageError::Io(msg) => write!(f, "IO error: {}", msg),
            StorageError::Render(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return StorageError::Timeout(err.to_string());
        }
        match err.status() {
            Some(status) => StorageError::HttpStatus(status.as_u16()),
            None => StorageError::Network(err.to_string()),
        }
    }
}

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        StorageError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for StorageError {
    fn from(err: toml::de::Error) -> Self {
        StorageError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_label() {
        let label = FacilityLabel::parse(
            "Opening Stock, Aldbrough, Medium Range Storage",
            Metric::AvailableCapacity,
        )
        .expect("standard label should parse");

        assert_eq!(label.metric, Metric::OpeningStock, "label metric wins over table metric");
        assert_eq!(label.facility, "Aldbrough");
        assert_eq!(label.category, StorageCategory::MediumRange);
    }

    #[test]
    fn test_parse_multi_word_facility() {
        let label = FacilityLabel::parse(
            "Available Capacity, Isle Of Grain, LNG Importation",
            Metric::AvailableCapacity,
        )
        .unwrap();
        assert_eq!(label.facility, "Isle Of Grain");
        assert_eq!(label.category, StorageCategory::LngImportation);
        assert_eq!(label.data_item(), "Available Capacity, Isle Of Grain, LNG Importation");
    }

    #[test]
    fn test_parse_falls_back_to_table_metric() {
        let label = FacilityLabel::parse("Rough, Long Range Storage", Metric::OpeningStock).unwrap();
        assert_eq!(label.metric, Metric::OpeningStock);
        assert_eq!(label.facility, "Rough");
    }

    #[test]
    fn test_parse_unknown_category_is_none() {
        assert!(FacilityLabel::parse("Opening Stock, Mystery, Short Range Storage", Metric::OpeningStock).is_none());
    }

    #[test]
    fn test_category_match_is_case_sensitive() {
        assert!(StorageCategory::detect("Opening Stock, Rough, long range storage").is_none());
        assert!(StorageCategory::detect("Opening Stock, Rough, Long Range Storage").is_some());
    }

    #[test]
    fn test_panel_columns_follow_category_order() {
        let columns: Vec<usize> = StorageCategory::ALL.iter().map(|c| c.column()).collect();
        assert_eq!(columns, vec![1, 2, 3]);
    }

    #[test]
    fn test_to_twh() {
        assert!((to_twh(150.0) - 1.5e-7).abs() < 1e-18);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(StorageError::HttpStatus(503).to_string(), "HTTP error: 503");
        assert_eq!(
            StorageError::DataShape("missing column \"Value\"".into()).to_string(),
            "Data shape error: missing column \"Value\""
        );
    }
}
