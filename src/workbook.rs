//! Spreadsheet dataset loading.
//!
//! The first row of a worksheet names the columns. Rows can be narrowed with
//! `COLUMN=VALUE` filters before the numeric columns are extracted.

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Sheet read when none is named on the command line
pub const DEFAULT_SHEET: &str = "processing output";

#[derive(Debug, Error, PartialEq)]
pub enum WorkbookError {
    #[error("sheet '{name}' not found (available: {})", .available.join(", "))]
    MissingSheet { name: String, available: Vec<String> },
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("column '{name}' not found (available: {})", .available.join(", "))]
    MissingColumn { name: String, available: Vec<String> },
    #[error("column '{0}' holds no numeric data")]
    NotNumeric(String),
    #[error("sheet is empty")]
    EmptySheet,
    #[error("no rows left after filtering")]
    NoRows,
    #[error("filter '{0}' must look like COLUMN=VALUE")]
    FilterSyntax(String),
}

/// A single worksheet cell, reduced to what the figures care about
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::String(s) => match s.trim().parse::<f64>() {
                Ok(n) => Cell::Number(n),
                Err(_) if s.trim().is_empty() => Cell::Empty,
                Err(_) => Cell::Text(s.clone()),
            },
            Data::Empty => Cell::Empty,
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Empty => Ok(()),
        }
    }
}

fn parse_bool_word(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Keep only rows whose `column` matches `expected`
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    pub column: String,
    pub expected: String,
}

impl RowFilter {
    pub fn matches(&self, cell: &Cell) -> bool {
        let expected = self.expected.trim();
        match cell {
            Cell::Bool(b) => parse_bool_word(expected) == Some(*b),
            Cell::Number(n) => expected.parse::<f64>().is_ok_and(|e| e == *n),
            Cell::Text(s) => {
                let s = s.trim();
                if s == expected {
                    return true;
                }
                match (parse_bool_word(s), parse_bool_word(expected)) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            Cell::Empty => expected.is_empty(),
        }
    }
}

impl FromStr for RowFilter {
    type Err = WorkbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((column, expected)) if !column.trim().is_empty() => Ok(Self {
                column: column.trim().to_string(),
                expected: expected.to_string(),
            }),
            _ => Err(WorkbookError::FilterSyntax(s.to_string())),
        }
    }
}

/// A named numeric column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Empty cells are NaN
    pub values: Vec<f64>,
}

impl Column {
    /// Values without the empty cells
    pub fn present(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|v| !v.is_nan()).collect()
    }
}

/// The numeric columns of one worksheet after filtering
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: usize,
    pub columns: Vec<Column>,
    /// Columns that hold text or booleans; usable as filters only
    pub non_numeric: Vec<String>,
}

impl Dataset {
    /// Build a dataset from a header and rows of cells
    pub fn from_rows(
        header: Vec<String>,
        rows: Vec<Vec<Cell>>,
        filters: &[RowFilter],
    ) -> Result<Self, WorkbookError> {
        if header.is_empty() {
            return Err(WorkbookError::EmptySheet);
        }

        let mut filter_idx = Vec::with_capacity(filters.len());
        for filter in filters {
            let idx = header
                .iter()
                .position(|h| *h == filter.column)
                .ok_or_else(|| WorkbookError::MissingColumn {
                    name: filter.column.clone(),
                    available: header.clone(),
                })?;
            filter_idx.push((idx, filter));
        }

        let kept: Vec<Vec<Cell>> = rows
            .into_iter()
            .filter(|row| {
                filter_idx.iter().all(|(idx, filter)| {
                    filter.matches(row.get(*idx).unwrap_or(&Cell::Empty))
                })
            })
            .collect();

        if kept.is_empty() {
            return Err(WorkbookError::NoRows);
        }

        let mut columns = Vec::new();
        let mut non_numeric = Vec::new();
        for (idx, name) in header.iter().enumerate() {
            let cells = kept.iter().map(|row| row.get(idx).unwrap_or(&Cell::Empty));
            let mut values = Vec::with_capacity(kept.len());
            let mut numeric = true;
            for cell in cells {
                match cell {
                    Cell::Number(n) => values.push(*n),
                    Cell::Empty => values.push(f64::NAN),
                    _ => {
                        numeric = false;
                        break;
                    }
                }
            }
            if numeric && values.iter().any(|v| !v.is_nan()) {
                columns.push(Column {
                    name: name.clone(),
                    values,
                });
            } else {
                debug!(column = %name, "skipping non-numeric column");
                non_numeric.push(name.clone());
            }
        }

        Ok(Self {
            rows: kept.len(),
            columns,
            non_numeric,
        })
    }

    /// Look up a numeric column by name
    pub fn column(&self, name: &str) -> Result<&Column, WorkbookError> {
        if self.non_numeric.iter().any(|n| n == name) {
            return Err(WorkbookError::NotNumeric(name.to_string()));
        }
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| WorkbookError::MissingColumn {
                name: name.to_string(),
                available: self.columns.iter().map(|c| c.name.clone()).collect(),
            })
    }
}

/// Load a worksheet into a dataset
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    sheet: Option<&str>,
    filters: &[RowFilter],
) -> Result<Dataset> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let available = workbook.sheet_names();
    let name = resolve_sheet(sheet, &available)?;
    debug!(path = %path.display(), sheet = %name, "reading worksheet");

    let range = workbook
        .worksheet_range(&name)
        .with_context(|| format!("Failed to read sheet '{}'", name))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or(WorkbookError::EmptySheet)?
        .iter()
        .map(|c| Cell::from(c).to_string().trim().to_string())
        .collect();
    let body: Vec<Vec<Cell>> = rows.map(|r| r.iter().map(Cell::from).collect()).collect();

    let dataset = Dataset::from_rows(header, body, filters)
        .with_context(|| format!("Failed to load sheet '{}'", name))?;
    Ok(dataset)
}

/// Pick the requested sheet, or the default one, or the first one
fn resolve_sheet(requested: Option<&str>, available: &[String]) -> Result<String, WorkbookError> {
    if let Some(name) = requested {
        return available
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| WorkbookError::MissingSheet {
                name: name.to_string(),
                available: available.to_vec(),
            });
    }

    if available.iter().any(|s| s == DEFAULT_SHEET) {
        return Ok(DEFAULT_SHEET.to_string());
    }

    let first = available.first().cloned().ok_or(WorkbookError::NoSheets)?;
    warn!(sheet = %first, "no '{}' sheet, using the first one", DEFAULT_SHEET);
    Ok(first)
}
