//! Grouping of cleaned metric tables by storage category.
//!
//! The downloads are organised by metric; the chart is organised by facility
//! type. `split_by_category` regroups the rows so each chart panel receives
//! one table holding both metrics for its category.

use std::collections::BTreeSet;

use crate::logging::{self, Stage};
use crate::model::{MetricTable, StorageCategory, StorageGroupTable};

/// Result of regrouping: one table per category in panel order, plus the
/// labels that matched no category.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    pub groups: Vec<StorageGroupTable>,
    /// Distinct labels excluded from every group, sorted.
    pub unmatched_labels: Vec<String>,
    pub unmatched_rows: usize,
}

impl SplitOutcome {
    pub fn group(&self, category: StorageCategory) -> Option<&StorageGroupTable> {
        self.groups.iter().find(|g| g.category == category)
    }

    pub fn grouped_rows(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }
}

/// Regroups metric tables by storage category.
///
/// For each category, the matching rows of each table are appended in the
/// order the tables are given. Rows whose label names no category are left
/// out of every group and reported in the outcome.
pub fn split_by_category(tables: &[MetricTable]) -> SplitOutcome {
    let groups: Vec<StorageGroupTable> = StorageCategory::ALL
        .into_iter()
        .map(|category| StorageGroupTable {
            category,
            rows: tables
                .iter()
                .flat_map(|table| table.rows.iter())
                .filter(|row| row.label.as_ref().map(|l| l.category) == Some(category))
                .cloned()
                .collect(),
        })
        .collect();

    let mut unmatched_labels = BTreeSet::new();
    let mut unmatched_rows = 0usize;
    for row in tables.iter().flat_map(|t| t.rows.iter()) {
        if row.label.is_none() {
            unmatched_rows += 1;
            unmatched_labels.insert(row.data_item.clone());
        }
    }

    for group in &groups {
        logging::debug(
            Stage::Split,
            Some(group.category.label()),
            &format!("{} rows", group.rows.len()),
        );
    }

    if unmatched_rows > 0 {
        logging::warn(
            Stage::Split,
            None,
            &format!(
                "{} rows match no storage category and are not charted: {}",
                unmatched_rows,
                unmatched_labels.iter().cloned().collect::<Vec<_>>().join("; ")
            ),
        );
    }

    SplitOutcome {
        groups,
        unmatched_labels: unmatched_labels.into_iter().collect(),
        unmatched_rows,
    }
}
