//! Declarative figure model.
//!
//! A `Figure` describes what to draw, not how: panels hold traces (bars,
//! lines, text) in draw order. It serializes to JSON for downstream tools
//! and is drawn to an image by `chart::render`.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::StorageCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarMode {
    Stack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub bar_mode: BarMode,
    /// strftime pattern for date tick labels.
    pub x_tick_format: String,
    /// All panels share one y scale.
    pub linked_y_axes: bool,
    pub show_grid: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            bar_mode: BarMode::Stack,
            x_tick_format: "%b %y".to_string(),
            linked_y_axes: true,
            show_grid: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTrace {
    /// Legend name; the metric label.
    pub name: String,
    pub facility: String,
    pub x: Vec<NaiveDate>,
    /// Twh.
    pub y: Vec<f64>,
    pub color: String,
    pub opacity: f64,
    pub legend_group: String,
    pub show_legend: bool,
    pub hover_template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTrace {
    pub name: String,
    pub x: Vec<NaiveDate>,
    pub y: Vec<f64>,
    pub color: String,
    pub width: f64,
    pub show_legend: bool,
    pub hover_template: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPosition {
    BottomLeft,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextTrace {
    pub name: String,
    pub x: NaiveDate,
    pub y: f64,
    pub text: String,
    pub position: TextPosition,
    pub font_size: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar(BarTrace),
    Line(LineTrace),
    Text(TextTrace),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub category: StorageCategory,
    pub title: String,
    pub row: usize,
    pub col: usize,
    pub traces: Vec<Trace>,
}

impl Panel {
    pub fn bars(&self) -> impl Iterator<Item = &BarTrace> {
        self.traces.iter().filter_map(|t| match t {
            Trace::Bar(bar) => Some(bar),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineTrace> {
        self.traces.iter().filter_map(|t| match t {
            Trace::Line(line) => Some(line),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextTrace> {
        self.traces.iter().filter_map(|t| match t {
            Trace::Text(text) => Some(text),
            _ => None,
        })
    }

    pub fn line(&self, name: &str) -> Option<&LineTrace> {
        self.lines().find(|l| l.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub subtitle: String,
    pub layout: Layout,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn panel(&self, category: StorageCategory) -> Option<&Panel> {
        self.panels.iter().find(|p| p.category == category)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Earliest and latest date of any trace.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.panels.iter().flat_map(|p| {
            p.traces.iter().flat_map(|t| match t {
                Trace::Bar(b) => b.x.clone(),
                Trace::Line(l) => l.x.clone(),
                Trace::Text(text) => vec![text.x],
            })
        });

        dates.fold(None, |span, d| match span {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }
}
