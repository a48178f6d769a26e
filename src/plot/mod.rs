//! Figure rendering. Every figure is written as SVG.

pub mod histogram;
pub mod step;

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub use histogram::{render_broken_histogram, HistogramLabels};
pub use step::{render_cpu_usage, CpuUsageLabels};

/// Cosmetic settings shared by all figures
#[derive(Debug, Clone)]
pub struct FigureStyle {
    pub width: u32,
    pub height: u32,
    pub font_family: String,
    pub font_size: u32,
    pub title: Option<String>,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
            font_family: "serif".to_string(),
            font_size: 18,
            title: None,
        }
    }
}

impl FigureStyle {
    fn font(&self) -> (&str, i32) {
        (self.font_family.as_str(), self.font_size as i32)
    }

    fn caption_font(&self) -> (&str, i32) {
        (self.font_family.as_str(), (self.font_size + self.font_size / 2) as i32)
    }
}

/// Where a figure goes: `<BASE>.svg` when a base is given, otherwise the
/// input path with `.svg` appended.
pub fn output_path(input: &Path, base: Option<&Path>) -> PathBuf {
    let base = base.unwrap_or(input);
    if base.extension().is_some_and(|ext| ext == "svg") {
        return base.to_path_buf();
    }
    let mut name = OsString::from(base.as_os_str());
    name.push(".svg");
    PathBuf::from(name)
}

/// Create the directory a figure will be written into
fn prepare_output(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    Ok(())
}
