//! Storage chart construction.
//!
//! Builds one panel per storage category. Within a panel each facility gets
//! one stacked bar per metric, followed by a "Total Stock" line, a "Total
//! Capacity" line (stock plus available capacity) and a text label at the
//! end of the capacity line.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::chart::figure::{
    BarTrace, Figure, Layout, LineTrace, Panel, TextPosition, TextTrace, Trace,
};
use crate::config::ChartConfig;
use crate::facilities::short_name;
use crate::logging::{self, Stage};
use crate::model::{to_twh, Metric, MetricRow, StorageCategory, StorageGroupTable};

pub const TOTAL_STOCK: &str = "Total Stock";
pub const TOTAL_CAPACITY: &str = "Total Capacity";

/// Opacity of every capacity bar, and the step by which each further stock
/// bar fades.
const CAPACITY_OPACITY: f64 = 0.075;
/// Twh gap between the end of the capacity line and its label.
const ANNOTATION_OFFSET: f64 = 0.5;
const ANNOTATION_FONT_SIZE: u32 = 10;
const LINE_WIDTH: f64 = 1.0;

/// Title and colour shared by every trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub title: String,
    pub subtitle: String,
    pub color: String,
}

impl From<&ChartConfig> for ChartStyle {
    fn from(config: &ChartConfig) -> Self {
        Self {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            color: config.color.clone(),
        }
    }
}

impl Default for ChartStyle {
    fn default() -> Self {
        ChartStyle::from(&ChartConfig::default())
    }
}

/// Capacity bars are near-transparent; stock bars fade with position so
/// adjacent facilities stay distinguishable. The floor only matters past 12
/// facilities in one category; the registry's largest category has 8.
pub fn bar_opacity(metric: Metric, index: usize) -> f64 {
    match metric {
        Metric::AvailableCapacity => CAPACITY_OPACITY,
        Metric::OpeningStock => (1.0 - index as f64 * CAPACITY_OPACITY).max(CAPACITY_OPACITY),
    }
}

pub fn bar_hover_template(facility: &str, metric: Metric) -> String {
    format!(
        "{}<br><b>At: </b>%{{x|%d %b %y}}<br><b>{}: </b>%{{y:,.1f}} Twh<extra></extra>",
        facility,
        metric.label()
    )
}

pub fn total_hover_template(name: &str) -> String {
    format!(
        "<br><b>At: </b>%{{x|%d %b %y}}<br><b>{}: </b>%{{y:,.1f}} Twh<extra></extra>",
        name
    )
}

/// Sums raw values per gas day, ascending by date. Blank values add
/// nothing; a day whose values are all blank sums to zero.
pub fn per_date_sum<'a>(rows: impl IntoIterator<Item = &'a MetricRow>) -> Vec<(NaiveDate, f64)> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.applicable_for).or_insert(0.0) += row.value.unwrap_or(0.0);
    }
    totals.into_iter().collect()
}

fn total_line(name: &str, totals: &[(NaiveDate, f64)], style: &ChartStyle) -> LineTrace {
    LineTrace {
        name: name.to_string(),
        x: totals.iter().map(|(d, _)| *d).collect(),
        y: totals.iter().map(|(_, v)| to_twh(*v)).collect(),
        color: style.color.clone(),
        width: LINE_WIDTH,
        show_legend: false,
        hover_template: total_hover_template(name),
    }
}

/// Facilities in first-appearance order, each with its rows.
fn rows_by_facility<'a>(rows: impl Iterator<Item = &'a MetricRow>) -> Vec<(String, Vec<&'a MetricRow>)> {
    let mut facilities: Vec<(String, Vec<&MetricRow>)> = Vec::new();
    for row in rows {
        let Some(label) = row.label.as_ref() else {
            continue;
        };
        let name = short_name(label);
        match facilities.iter_mut().find(|(f, _)| *f == name) {
            Some((_, bucket)) => bucket.push(row),
            None => facilities.push((name, vec![row])),
        }
    }
    facilities
}

fn build_panel(group: &StorageGroupTable, style: &ChartStyle) -> Panel {
    let category = group.category;
    let mut traces = Vec::new();

    for metric in Metric::ALL {
        let facilities = rows_by_facility(group.rows_for(metric));

        for (index, (facility, rows)) in facilities.iter().enumerate() {
            let (x, y): (Vec<NaiveDate>, Vec<f64>) = rows
                .iter()
                .filter_map(|r| r.value.map(|v| (r.applicable_for, to_twh(v))))
                .unzip();
            traces.push(Trace::Bar(BarTrace {
                name: metric.label().to_string(),
                facility: facility.clone(),
                x,
                y,
                color: style.color.clone(),
                opacity: bar_opacity(metric, index),
                legend_group: metric.index().to_string(),
                show_legend: index == 0 && category == StorageCategory::LongRange,
                hover_template: bar_hover_template(facility, metric),
            }));
        }

        if metric == Metric::OpeningStock {
            let totals = per_date_sum(group.rows_for(metric));
            traces.push(Trace::Line(total_line(TOTAL_STOCK, &totals, style)));
        }
    }

    let totals = per_date_sum(&group.rows);
    traces.push(Trace::Line(total_line(TOTAL_CAPACITY, &totals, style)));

    match totals.last() {
        Some((last_day, last_total)) => traces.push(Trace::Text(TextTrace {
            name: "Capacity".to_string(),
            x: *last_day,
            y: to_twh(*last_total) + ANNOTATION_OFFSET,
            text: TOTAL_CAPACITY.to_string(),
            position: TextPosition::BottomLeft,
            font_size: ANNOTATION_FONT_SIZE,
            color: style.color.clone(),
        })),
        None => logging::warn(
            Stage::Chart,
            Some(category.label()),
            "no rows for this category; panel left empty",
        ),
    }

    Panel {
        category,
        title: category.panel_title().to_string(),
        row: 1,
        col: category.column(),
        traces,
    }
}

/// Builds the three-panel storage figure from the per-category tables.
///
/// Panels follow `StorageCategory::ALL`; a category with no table gets an
/// empty group.
pub fn build_figure(groups: &[StorageGroupTable], style: &ChartStyle) -> Figure {
    let panels = StorageCategory::ALL
        .into_iter()
        .map(|category| {
            let empty;
            let group = match groups.iter().find(|g| g.category == category) {
                Some(group) => group,
                None => {
                    empty = StorageGroupTable { category, rows: Vec::new() };
                    &empty
                }
            };
            build_panel(group, style)
        })
        .collect::<Vec<_>>();

    let bar_count: usize = panels.iter().map(|p| p.bars().count()).sum();
    logging::info(
        Stage::Chart,
        None,
        &format!("{} panels, {} bar series", panels.len(), bar_count),
    );

    Figure {
        title: style.title.clone(),
        subtitle: style.subtitle.clone(),
        layout: Layout::default(),
        panels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FacilityLabel;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn row(item: &str, metric: Metric, d: u32, value: f64) -> MetricRow {
        MetricRow {
            data_item: item.to_string(),
            label: FacilityLabel::parse(item, metric),
            applicable_for: day(d),
            value: Some(value),
        }
    }

    fn medium_group() -> StorageGroupTable {
        let stock = "Opening Stock, Aldbrough, Medium Range Storage";
        let cap = "Available Capacity, Aldbrough, Medium Range Storage";
        StorageGroupTable {
            category: StorageCategory::MediumRange,
            rows: vec![
                row(stock, Metric::OpeningStock, 1, 100.0),
                row(stock, Metric::OpeningStock, 2, 200.0),
                row(stock, Metric::OpeningStock, 3, 150.0),
                row(cap, Metric::AvailableCapacity, 1, 100.0),
                row(cap, Metric::AvailableCapacity, 2, 200.0),
                row(cap, Metric::AvailableCapacity, 3, 150.0),
            ],
        }
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-15, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_single_facility_scenario() {
        let figure = build_figure(&[medium_group()], &ChartStyle::default());
        let panel = figure.panel(StorageCategory::MediumRange).unwrap();

        let stock_bars: Vec<&BarTrace> = panel.bars().filter(|b| b.name == "Opening Stock").collect();
        assert_eq!(stock_bars.len(), 1);
        assert_eq!(stock_bars[0].facility, "Aldbrough");
        assert_eq!(stock_bars[0].x, vec![day(1), day(2), day(3)]);
        assert_close(&stock_bars[0].y, &[1e-7, 2e-7, 1.5e-7]);

        let total_stock = panel.line(TOTAL_STOCK).unwrap();
        assert_close(&total_stock.y, &[1e-7, 2e-7, 1.5e-7]);

        let total_capacity = panel.line(TOTAL_CAPACITY).unwrap();
        assert_close(&total_capacity.y, &[2e-7, 4e-7, 3e-7]);
    }

    #[test]
    fn test_total_capacity_equals_sum_of_bars() {
        let mut group = medium_group();
        group.rows.push(row("Opening Stock, Hornsea, Medium Range Storage", Metric::OpeningStock, 2, 50.0));
        let figure = build_figure(&[group], &ChartStyle::default());
        let panel = figure.panel(StorageCategory::MediumRange).unwrap();

        let mut bar_sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for bar in panel.bars() {
            for (d, y) in bar.x.iter().zip(&bar.y) {
                *bar_sums.entry(*d).or_insert(0.0) += y;
            }
        }

        let total = panel.line(TOTAL_CAPACITY).unwrap();
        assert_eq!(total.x, bar_sums.keys().copied().collect::<Vec<_>>());
        assert_close(&total.y, &bar_sums.values().copied().collect::<Vec<_>>());
    }

    #[test]
    fn test_trace_order_within_panel() {
        let figure = build_figure(&[medium_group()], &ChartStyle::default());
        let panel = figure.panel(StorageCategory::MediumRange).unwrap();
        let kinds: Vec<&str> = panel
            .traces
            .iter()
            .map(|t| match t {
                Trace::Bar(b) => b.name.as_str(),
                Trace::Line(l) => l.name.as_str(),
                Trace::Text(_) => "text",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["Opening Stock", TOTAL_STOCK, "Available Capacity", TOTAL_CAPACITY, "text"]
        );
    }

    #[test]
    fn test_legend_only_on_first_long_range_facility() {
        let groups = vec![
            StorageGroupTable {
                category: StorageCategory::LongRange,
                rows: vec![
                    row("Opening Stock, Rough, Long Range Storage", Metric::OpeningStock, 1, 10.0),
                    row("Available Capacity, Rough, Long Range Storage", Metric::AvailableCapacity, 1, 5.0),
                ],
            },
            medium_group(),
        ];
        let figure = build_figure(&groups, &ChartStyle::default());

        let shown: Vec<(StorageCategory, String, String)> = figure
            .panels
            .iter()
            .flat_map(|p| p.bars().filter(|b| b.show_legend).map(move |b| (p.category, b.name.clone(), b.legend_group.clone())))
            .collect();
        assert_eq!(
            shown,
            vec![
                (StorageCategory::LongRange, "Opening Stock".to_string(), "0".to_string()),
                (StorageCategory::LongRange, "Available Capacity".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_bar_opacity() {
        assert_eq!(bar_opacity(Metric::AvailableCapacity, 0), 0.075);
        assert_eq!(bar_opacity(Metric::AvailableCapacity, 5), 0.075);
        assert_eq!(bar_opacity(Metric::OpeningStock, 0), 1.0);
        assert!((bar_opacity(Metric::OpeningStock, 2) - 0.85).abs() < 1e-12);
        assert_eq!(bar_opacity(Metric::OpeningStock, 40), 0.075);
    }

    #[test]
    fn test_annotation_sits_above_last_total() {
        let figure = build_figure(&[medium_group()], &ChartStyle::default());
        let panel = figure.panel(StorageCategory::MediumRange).unwrap();
        let text: Vec<&TextTrace> = panel.texts().collect();
        assert_eq!(text.len(), 1);
        assert_eq!(text[0].x, day(3));
        assert!((text[0].y - (3e-7 + 0.5)).abs() < 1e-12);
        assert_eq!(text[0].text, "Total Capacity");
        assert_eq!(text[0].position, TextPosition::BottomLeft);
    }

    #[test]
    fn test_missing_group_gives_empty_panel() {
        let figure = build_figure(&[medium_group()], &ChartStyle::default());
        assert_eq!(figure.panels.len(), 3);
        let lng = figure.panel(StorageCategory::LngImportation).unwrap();
        assert_eq!(lng.bars().count(), 0);
        assert_eq!(lng.texts().count(), 0);
        assert_eq!(lng.col, 3);
        assert_eq!(lng.title, "LNG Importation");
    }

    #[test]
    fn test_hover_template() {
        assert_eq!(
            bar_hover_template("Rough", Metric::OpeningStock),
            "Rough<br><b>At: </b>%{x|%d %b %y}<br><b>Opening Stock: </b>%{y:,.1f} Twh<extra></extra>"
        );
    }

    #[test]
    fn test_blank_values_are_left_out_of_bars_and_sums() {
        let stock = "Opening Stock, Aldbrough, Medium Range Storage";
        let mut blank = row(stock, Metric::OpeningStock, 2, 0.0);
        blank.value = None;
        let group = StorageGroupTable {
            category: StorageCategory::MediumRange,
            rows: vec![row(stock, Metric::OpeningStock, 1, 100.0), blank],
        };

        let figure = build_figure(&[group], &ChartStyle::default());
        let panel = figure.panel(StorageCategory::MediumRange).unwrap();

        let bar = panel.bars().next().unwrap();
        assert_eq!(bar.x, vec![day(1)]);
        assert_close(&bar.y, &[1e-7]);

        let total = panel.line(TOTAL_STOCK).unwrap();
        assert_eq!(total.x, vec![day(1), day(2)]);
        assert_close(&total.y, &[1e-7, 0.0]);
    }

    #[test]
    fn test_per_date_sum_sorts_dates() {
        let rows = vec![
            row("Opening Stock, Rough, Long Range Storage", Metric::OpeningStock, 3, 1.0),
            row("Opening Stock, Rough, Long Range Storage", Metric::OpeningStock, 1, 2.0),
            row("Opening Stock, Hornsea, Medium Range Storage", Metric::OpeningStock, 3, 4.0),
        ];
        assert_eq!(per_date_sum(&rows), vec![(day(1), 2.0), (day(3), 5.0)]);
    }

    #[test]
    fn test_figure_json_has_tagged_traces() {
        let figure = build_figure(&[medium_group()], &ChartStyle::default());
        let json = figure.to_json().unwrap();
        assert!(json.contains("\"type\": \"bar\""));
        assert!(json.contains("\"bar_mode\": \"stack\""));
        assert!(json.contains("\"2024-01-03\""));
    }
}
