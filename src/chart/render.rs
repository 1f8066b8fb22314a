//! Static image rendering of a `Figure` with plotters.
//!
//! Panels are laid out side by side under the title. Bars are stacked per
//! gas day in trace order, one day wide, and every panel uses the same
//! y range so the categories can be compared by eye.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::chart::figure::{BarTrace, Figure, Panel, TextPosition};
use crate::config::parse_hex_color;
use crate::logging::{self, Stage};
use crate::model::{Result, StorageError};

const TITLE_AREA_HEIGHT: u32 = 60;
const Y_HEADROOM: f64 = 1.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("svg") => Ok(ImageFormat::Svg),
            Some("png") => Ok(ImageFormat::Png),
            _ => Err(StorageError::Render(format!(
                "unsupported image extension for {}, expected .svg or .png",
                path.display()
            ))),
        }
    }
}

fn render_err<E: std::fmt::Display>(err: E) -> StorageError {
    StorageError::Render(err.to_string())
}

fn color_of(hex: &str) -> Result<RGBColor> {
    let (r, g, b) = parse_hex_color(hex)?;
    Ok(RGBColor(r, g, b))
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// One bar segment: a day-wide slice of a stacked column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackedSegment {
    pub day: NaiveDate,
    pub bottom: f64,
    pub top: f64,
}

/// Stacks every bar trace of a panel, in trace order, per gas day.
pub fn stack_bars(panel: &Panel) -> Vec<(&BarTrace, Vec<StackedSegment>)> {
    let mut heights: std::collections::HashMap<NaiveDate, f64> = std::collections::HashMap::new();

    panel
        .bars()
        .map(|bar| {
            let segments = bar
                .x
                .iter()
                .zip(&bar.y)
                .map(|(day, y)| {
                    let bottom = heights.entry(*day).or_insert(0.0);
                    let segment = StackedSegment {
                        day: *day,
                        bottom: *bottom,
                        top: *bottom + y,
                    };
                    *bottom = segment.top;
                    segment
                })
                .collect();
            (bar, segments)
        })
        .collect()
}

/// Highest point any panel reaches, with headroom; shared by all panels.
pub fn shared_y_max(figure: &Figure) -> f64 {
    let highest = figure
        .panels
        .iter()
        .flat_map(|panel| {
            let bar_tops: Vec<f64> = stack_bars(panel)
                .into_iter()
                .flat_map(|(_, segs)| segs.into_iter().map(|s| s.top))
                .collect();
            let line_tops = panel.lines().flat_map(|l| l.y.iter().copied());
            let text_tops = panel.texts().map(|t| t.y);
            bar_tops.into_iter().chain(line_tops).chain(text_tops).collect::<Vec<_>>()
        })
        .fold(0.0_f64, f64::max);

    if highest > 0.0 { highest * Y_HEADROOM } else { 1.0 }
}

fn x_of(start: NaiveDate, day: NaiveDate) -> f64 {
    (day - start).num_days() as f64
}

fn text_pos(position: TextPosition) -> Pos {
    match position {
        // the anchor is the text's top-right corner, so it extends down-left
        TextPosition::BottomLeft => Pos::new(HPos::Right, VPos::Top),
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    figure: &Figure,
    panel: &Panel,
    start: NaiveDate,
    x_max: f64,
    y_max: f64,
    y_desc: Option<&str>,
) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)
        .map_err(render_err)?;

    let tick_format = figure.layout.x_tick_format.clone();
    let x_formatter = move |x: &f64| (start + Duration::days(x.floor() as i64)).format(&tick_format).to_string();
    let y_formatter = |y: &f64| format!("{:.0}", y);

    let mut mesh = chart.configure_mesh();
    mesh.x_labels(6)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter);
    if let Some(desc) = y_desc {
        mesh.y_desc(desc);
    }
    if !figure.layout.show_grid {
        mesh.disable_mesh();
    }
    mesh.draw().map_err(render_err)?;

    for (bar, segments) in stack_bars(panel) {
        let color = color_of(&bar.color)?;
        let style = color.mix(bar.opacity).filled();
        let series = chart
            .draw_series(segments.iter().map(|s| {
                let x0 = x_of(start, s.day);
                Rectangle::new([(x0, s.bottom), (x0 + 1.0, s.top)], style)
            }))
            .map_err(render_err)?;

        if bar.show_legend {
            series
                .label(bar.name.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], style));
        }
    }

    for line in panel.lines() {
        let color = color_of(&line.color)?;
        let style = ShapeStyle::from(&color).stroke_width(line.width.round().max(1.0) as u32);
        chart
            .draw_series(LineSeries::new(
                line.x.iter().zip(&line.y).map(|(d, y)| (x_of(start, *d) + 0.5, *y)),
                style,
            ))
            .map_err(render_err)?;
    }

    for text in panel.texts() {
        let color = color_of(&text.color)?;
        let font = ("sans-serif", text.font_size as f64)
            .into_font()
            .color(&color)
            .pos(text_pos(text.position));
        chart
            .draw_series(std::iter::once(Text::new(
                text.text.clone(),
                (x_of(start, text.x) + 1.0, text.y),
                font,
            )))
            .map_err(render_err)?;
    }

    if panel.bars().any(|b| b.show_legend) {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_err)?;
    }

    Ok(())
}

/// Draws the whole figure onto a drawing area.
pub fn draw_figure<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<()> {
    root.fill(&WHITE).map_err(render_err)?;

    let (title_area, body) = root.split_vertically(TITLE_AREA_HEIGHT);
    title_area
        .draw(&Text::new(figure.title.clone(), (10, 8), ("sans-serif", 24).into_font()))
        .map_err(render_err)?;
    title_area
        .draw(&Text::new(
            figure.subtitle.clone(),
            (10, 36),
            ("sans-serif", 14).into_font().color(&RGBColor(128, 128, 128)),
        ))
        .map_err(render_err)?;

    let Some((start, end)) = figure.date_span() else {
        logging::warn(Stage::Render, None, "figure has no data; drawing title only");
        return Ok(());
    };
    let x_max = x_of(start, end) + 1.0;
    let y_max = shared_y_max(figure);

    let areas = body.split_evenly((1, figure.panels.len().max(1)));
    for (index, (area, panel)) in areas.iter().zip(&figure.panels).enumerate() {
        let y_desc = (index == 0).then_some(figure.subtitle.as_str());
        draw_panel(area, figure, panel, start, x_max, y_max, y_desc)?;
    }

    Ok(())
}

/// Renders the figure to an SVG document in memory.
pub fn render_svg_string(figure: &Figure, width: u32, height: u32) -> Result<String> {
    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, (width, height)).into_drawing_area();
        draw_figure(&root, figure)?;
        root.present().map_err(render_err)?;
    }
    Ok(buffer)
}

/// Renders the figure to an `.svg` or `.png` file.
pub fn render_to_file(figure: &Figure, path: &Path, width: u32, height: u32) -> Result<()> {
    match ImageFormat::from_path(path)? {
        ImageFormat::Svg => {
            let svg = render_svg_string(figure, width, height)?;
            std::fs::write(path, svg)
                .map_err(|e| StorageError::Io(format!("{}: {}", path.display(), e)))?;
        }
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
            draw_figure(&root, figure)?;
            root.present().map_err(render_err)?;
        }
    }

    logging::info(Stage::Render, None, &format!("chart written to {}", path.display()));
    Ok(())
}
