//! Histogram with a broken y axis.
//!
//! A few bins hold most of the data, so the counts are split over two
//! stacked panels: the lower one shows `0..break_at`, the upper one the
//! outliers above `break_at`.

use super::{prepare_output, FigureStyle};
use crate::stats::{format_fraction_percent, histogram_counts};
use anyhow::{bail, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Break mark size, relative to the plotting area
const BREAK_MARK: f64 = 0.015;

/// Headroom above the tallest bar
const TOP_HEADROOM: f64 = 1.05;

#[derive(Debug, Clone)]
pub struct HistogramLabels {
    pub x_desc: String,
    pub y_desc: String,
}

impl Default for HistogramLabels {
    fn default() -> Self {
        Self {
            x_desc: "Global Scripting %".to_string(),
            y_desc: "Count".to_string(),
        }
    }
}

/// Render the broken-axis histogram into an SVG file
pub fn render_broken_histogram<P: AsRef<Path>>(
    values: &[f64],
    edges: &[f64],
    break_at: f64,
    style: &FigureStyle,
    labels: &HistogramLabels,
    path: P,
) -> Result<()> {
    prepare_output(path.as_ref())?;
    let root = SVGBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    draw_broken_histogram(root, values, edges, break_at, style, labels)
}

/// Draw the broken-axis histogram on any backend.
///
/// When no bin reaches `break_at` a single panel is drawn instead.
pub fn draw_broken_histogram<DB>(
    root: DrawingArea<DB, Shift>,
    values: &[f64],
    edges: &[f64],
    break_at: f64,
    style: &FigureStyle,
    labels: &HistogramLabels,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if edges.len() < 2 {
        bail!("histogram needs at least two bin edges");
    }
    if !(break_at.is_finite() && break_at > 0.0) {
        bail!("axis break must be a positive count, got {}", break_at);
    }

    let counts = histogram_counts(values, edges);
    let max_count = counts.iter().copied().max().unwrap_or(0) as f64;
    let x_range = edges[0]..edges[edges.len() - 1];
    debug!(bins = counts.len(), max_count, "histogram binned");

    root.fill(&WHITE)?;

    if max_count <= break_at {
        let y_top = (max_count * TOP_HEADROOM).max(1.0);
        draw_panel(&root, &counts, edges, x_range, 0.0..y_top, style, labels, Panel::Single)?;
        root.present()?;
        return Ok(());
    }

    let split = (style.height / 2) as i32;
    let (upper, lower) = root.split_vertically(split);

    let top_range = break_at..(max_count * TOP_HEADROOM).max(break_at + 1.0);
    let upper_area = draw_panel(
        &upper,
        &counts,
        edges,
        x_range.clone(),
        top_range,
        style,
        labels,
        Panel::Upper,
    )?;
    let lower_area = draw_panel(
        &lower,
        &counts,
        edges,
        x_range,
        0.0..break_at,
        style,
        labels,
        Panel::Lower,
    )?;

    draw_break_marks(&root, &upper_area.0, upper_area.1.end)?;
    draw_break_marks(&root, &lower_area.0, lower_area.1.start)?;

    root.present()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Panel {
    Single,
    Upper,
    Lower,
}

/// Draw one panel and return the pixel ranges of its plotting area
#[allow(clippy::too_many_arguments)]
fn draw_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    counts: &[u64],
    edges: &[f64],
    x_range: Range<f64>,
    y_range: Range<f64>,
    style: &FigureStyle,
    labels: &HistogramLabels,
    panel: Panel,
) -> Result<(Range<i32>, Range<i32>)>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let shows_x_axis = panel != Panel::Upper;

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(10)
        .y_label_area_size((style.font_size * 4) as i32)
        .x_label_area_size(if shows_x_axis { (style.font_size * 3) as i32 } else { 0 });
    if panel != Panel::Lower {
        if let Some(ref title) = style.title {
            builder.caption(title, style.caption_font());
        }
    }
    let mut chart = builder.build_cartesian_2d(x_range, y_range.clone())?;

    let x_fmt = |x: &f64| format_fraction_percent(*x);
    let y_fmt = |y: &f64| format!("{:.0}", y);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .light_line_style(TRANSPARENT)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style(style.font())
        .axis_desc_style(style.font());
    if shows_x_axis {
        mesh.x_desc(labels.x_desc.as_str());
    }
    if panel != Panel::Upper {
        mesh.y_desc(labels.y_desc.as_str());
    }
    mesh.draw()?;

    chart.draw_series(counts.iter().enumerate().filter_map(|(i, &count)| {
        let bar = clip_bar(count as f64, &y_range)?;
        Some(Rectangle::new(
            [(edges[i], bar.start), (edges[i + 1], bar.end)],
            BLUE.mix(0.8).filled(),
        ))
    }))?;

    Ok(chart.plotting_area().get_pixel_range())
}

/// The visible part of a bar of height `count` inside `y_range`
fn clip_bar(count: f64, y_range: &Range<f64>) -> Option<Range<f64>> {
    if count <= y_range.start {
        return None;
    }
    Some(y_range.start..count.min(y_range.end))
}

/// Diagonal marks on both ends of the horizontal edge at pixel row `y`
fn draw_break_marks<DB>(root: &DrawingArea<DB, Shift>, x_px: &Range<i32>, y: i32) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let width = (x_px.end - x_px.start) as f64;
    let dx = (width * BREAK_MARK).round().max(3.0) as i32;
    let dy = dx;
    let (root_x, root_y) = root.get_base_pixel();

    for x in [x_px.start, x_px.end] {
        let (x, y) = (x - root_x, y - root_y);
        root.draw(&PathElement::new(vec![(x - dx, y + dy), (x + dx, y - dy)], BLACK))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::bin_edges;

    fn draw_to_string(values: &[f64], edges: &[f64], break_at: f64) -> Result<String> {
        let mut svg = String::new();
        {
            let style = FigureStyle::default();
            let root = SVGBackend::with_string(&mut svg, (style.width, style.height))
                .into_drawing_area();
            draw_broken_histogram(root, values, edges, break_at, &style, &HistogramLabels::default())?;
        }
        Ok(svg)
    }

    fn skewed_values() -> Vec<f64> {
        // 60 values in the first bin, a thin tail up to 20%
        let mut values = vec![0.001; 60];
        values.extend([0.02, 0.05, 0.05, 0.1, 0.2]);
        values
    }

    #[test]
    fn clip_bar_limits_to_panel() {
        assert_eq!(clip_bar(10.0, &(0.0..35.0)), Some(0.0..10.0));
        assert_eq!(clip_bar(60.0, &(0.0..35.0)), Some(0.0..35.0));
        assert_eq!(clip_bar(10.0, &(35.0..63.0)), None);
        assert_eq!(clip_bar(60.0, &(35.0..63.0)), Some(35.0..60.0));
        assert_eq!(clip_bar(0.0, &(0.0..35.0)), None);
    }

    #[test]
    fn draws_two_panels_when_counts_exceed_break() {
        let values = skewed_values();
        let edges = bin_edges(0.2, 0.005).unwrap();
        let svg = draw_to_string(&values, &edges, 35.0).unwrap();
        assert!(svg.contains("Global Scripting %"));
        assert!(svg.contains("Count"));
        assert!(svg.contains("10%"));
        // count labels from both panels
        assert!(svg.contains(">40<") || svg.contains(">50<"));
        assert!(svg.contains(">0<"));
    }

    #[test]
    fn falls_back_to_single_panel() {
        let edges = bin_edges(0.2, 0.005).unwrap();
        let svg = draw_to_string(&[0.01, 0.02, 0.02], &edges, 35.0).unwrap();
        assert!(svg.contains("Count"));
    }

    #[test]
    fn rejects_bad_break() {
        let edges = bin_edges(0.2, 0.005).unwrap();
        assert!(draw_to_string(&skewed_values(), &edges, 0.0).is_err());
        assert!(draw_to_string(&skewed_values(), &[0.0], 35.0).is_err());
    }

    #[test]
    fn renders_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hist.svg");
        let edges = bin_edges(0.2, 0.005).unwrap();
        render_broken_histogram(
            &skewed_values(),
            &edges,
            35.0,
            &FigureStyle::default(),
            &HistogramLabels::default(),
            &path,
        )
        .unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
