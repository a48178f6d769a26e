//! CPU usage over time as a step plot.

use super::{prepare_output, FigureStyle};
use crate::stats::{format_min_sec, format_percent, min_max, padded_range};
use crate::trace::CpuTrace;
use anyhow::{anyhow, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// Axis descriptions of the CPU usage figure
#[derive(Debug, Clone)]
pub struct CpuUsageLabels {
    pub x_desc: String,
    pub y_desc: String,
}

impl Default for CpuUsageLabels {
    fn default() -> Self {
        Self {
            x_desc: "Time in background [mm:ss]".to_string(),
            y_desc: "CPU usage".to_string(),
        }
    }
}

/// Polyline for a step plot where each sample's value applies to the
/// interval ending at that sample.
pub fn step_points(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    let n = xs.len().min(ys.len());
    let mut points = Vec::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            points.push((xs[i - 1], ys[i]));
        }
        points.push((xs[i], ys[i]));
    }
    points
}

/// Render the CPU usage step plot into an SVG file
pub fn render_cpu_usage<P: AsRef<Path>>(
    trace: &CpuTrace,
    style: &FigureStyle,
    labels: &CpuUsageLabels,
    path: P,
) -> Result<()> {
    prepare_output(path.as_ref())?;
    let root = SVGBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    draw_cpu_usage(root, trace, style, labels)
}

/// Draw the CPU usage step plot on any backend
pub fn draw_cpu_usage<DB>(
    root: DrawingArea<DB, Shift>,
    trace: &CpuTrace,
    style: &FigureStyle,
    labels: &CpuUsageLabels,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let times = trace.times_secs();
    let usage = trace.usage_percent();
    let score = trace.score_percent();

    let (t_min, t_max) = min_max(&times).ok_or_else(|| anyhow!("trace has no samples"))?;
    let (x_lo, x_hi) = padded_range(t_min, t_max);

    // autoscale, then always show the full 0..100 band
    let mut all_y = usage.clone();
    if let Some(ref s) = score {
        all_y.extend_from_slice(s);
    }
    let (y_min, y_max) = min_max(&all_y).ok_or_else(|| anyhow!("trace has no usage values"))?;
    let (y_lo, y_hi) = padded_range(y_min, y_max);
    let (y_lo, y_hi) = (y_lo.min(0.0), y_hi.max(100.0));

    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(10)
        .x_label_area_size((style.font_size * 3) as i32)
        .y_label_area_size((style.font_size * 4) as i32);
    if let Some(ref title) = style.title {
        builder.caption(title, style.caption_font());
    }
    let mut chart = builder.build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(TRANSPARENT)
        .x_desc(labels.x_desc.as_str())
        .y_desc(labels.y_desc.as_str())
        .x_label_formatter(&|x| format_min_sec(*x))
        .y_label_formatter(&|y| format_percent(*y))
        .label_style(style.font())
        .axis_desc_style(style.font())
        .draw()?;

    chart
        .draw_series(LineSeries::new(step_points(&times, &usage), BLUE.stroke_width(2)))?
        .label("CPU usage")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    if let Some(ref score) = score {
        chart
            .draw_series(LineSeries::new(step_points(&times, score), RED.stroke_width(2)))?
            .label("Score")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        chart
            .configure_series_labels()
            .label_font(style.font())
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
