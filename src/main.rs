//! thesisplot - figures for the background execution thesis.
//!
//! Renders CPU usage traces as step plots and scripting-score spreadsheets
//! as broken-axis histograms, one SVG figure per invocation.

mod plot;
mod report;
mod stats;
mod trace;
mod workbook;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use num_format::{Locale, ToFormattedString};
use plot::{CpuUsageLabels, FigureStyle, HistogramLabels};
use report::QuantileReport;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trace::Delimiter;
use workbook::RowFilter;

/// Render thesis figures from measurement data
#[derive(Parser, Debug)]
#[command(name = "thesisplot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log progress at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Step plot of a CPU usage trace (time in ms, usage fraction, optional score)
    CpuUsage(CpuUsageArgs),
    /// Broken-axis histogram of a spreadsheet column, plus a quantile report
    Histogram(HistogramArgs),
}

/// Cosmetic options shared by every figure
#[derive(Args, Debug)]
struct StyleArgs {
    /// Output base path; `.svg` is appended (default: input path + `.svg`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Figure title
    #[arg(short, long)]
    title: Option<String>,

    /// Figure width in pixels
    #[arg(long, default_value = "960")]
    width: u32,

    /// Figure height in pixels
    #[arg(long, default_value = "540")]
    height: u32,

    /// Font family for labels
    #[arg(long, default_value = "serif")]
    font: String,

    /// Font size for labels
    #[arg(long, default_value = "18")]
    font_size: u32,
}

impl StyleArgs {
    fn figure_style(&self) -> FigureStyle {
        FigureStyle {
            width: self.width,
            height: self.height,
            font_family: self.font.clone(),
            font_size: self.font_size,
            title: self.title.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct CpuUsageArgs {
    /// Trace file (tab or comma separated)
    input: PathBuf,

    /// Column separator
    #[arg(short, long, value_enum, default_value = "auto")]
    delimiter: Delimiter,

    /// X axis description
    #[arg(long, default_value = "Time in background [mm:ss]")]
    x_label: String,

    /// Y axis description
    #[arg(long, default_value = "CPU usage")]
    y_label: String,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct HistogramArgs {
    /// Spreadsheet workbook (xlsx, xls, ods)
    input: PathBuf,

    /// Worksheet name (default: "processing output", else the first sheet)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Column to plot
    #[arg(short, long, default_value = "Global Scripting %")]
    column: String,

    /// Keep only rows where COLUMN equals VALUE (repeatable)
    #[arg(short, long = "filter", value_name = "COLUMN=VALUE")]
    filters: Vec<RowFilter>,

    /// Bin width, in the column's unit
    #[arg(long, default_value = "0.005")]
    step: f64,

    /// Count at which the y axis is broken
    #[arg(long, default_value = "35")]
    break_at: f64,

    /// Quantiles to report
    #[arg(short, long, value_delimiter = ',', default_value = "0.75,0.9,0.99")]
    quantiles: Vec<f64>,

    /// Print the quantile report as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    style: StyleArgs,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::CpuUsage(args) => run_cpu_usage(args),
        Command::Histogram(args) => run_histogram(args),
    }
}

fn run_cpu_usage(args: CpuUsageArgs) -> Result<()> {
    info!("Loading trace from: {}", args.input.display());
    let trace = trace::load_trace(&args.input, args.delimiter)?;
    info!(
        "Loaded {} samples",
        trace.len().to_formatted_string(&Locale::en)
    );

    let labels = CpuUsageLabels {
        x_desc: args.x_label,
        y_desc: args.y_label,
    };
    let path = plot::output_path(&args.input, args.style.output.as_deref());
    plot::render_cpu_usage(&trace, &args.style.figure_style(), &labels, &path)
        .with_context(|| format!("Failed to render {}", path.display()))?;

    info!("Generated plot: {}", path.display());
    Ok(())
}

fn run_histogram(args: HistogramArgs) -> Result<()> {
    if args.filters.is_empty() {
        info!("Loading dataset from: {}", args.input.display());
    } else {
        info!(
            "Loading dataset from: {} ({} filters)",
            args.input.display(),
            args.filters.len()
        );
    }
    let dataset = workbook::load_dataset(&args.input, args.sheet.as_deref(), &args.filters)?;
    info!(
        "Loaded {} rows, {} numeric columns",
        dataset.rows.to_formatted_string(&Locale::en),
        dataset.columns.len()
    );

    let report = QuantileReport::compute(&dataset, &args.quantiles)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    let values = dataset.column(&args.column)?.present();
    let Some((_, max)) = stats::min_max(&values) else {
        bail!("column '{}' has no values", args.column);
    };
    let edges = stats::bin_edges(max, args.step)?;

    let labels = HistogramLabels {
        x_desc: args.column.clone(),
        ..HistogramLabels::default()
    };
    let path = plot::output_path(&args.input, args.style.output.as_deref());
    plot::render_broken_histogram(
        &values,
        &edges,
        args.break_at,
        &args.style.figure_style(),
        &labels,
        &path,
    )
    .with_context(|| format!("Failed to render {}", path.display()))?;

    info!("Generated plot: {}", path.display());
    Ok(())
}
