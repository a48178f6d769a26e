//! CPU-usage trace loading from tab or comma separated files.
//!
//! Each row holds the elapsed time in milliseconds, the CPU usage as a 0..1
//! fraction and optionally a score fraction. There is no header row.

use crate::stats::{fraction_to_percent, ms_to_secs};
use anyhow::{Context, Result};
use clap::ValueEnum;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Field separator of a trace file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Delimiter {
    /// Tab if the first data line contains one, comma otherwise
    Auto,
    Tab,
    Comma,
}

impl Delimiter {
    fn byte(self) -> Option<u8> {
        match self {
            Delimiter::Auto => None,
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Comma => Some(b','),
        }
    }
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: expected at least 2 columns, found {found}")]
    TooFewColumns { line: u64, found: usize },
    #[error("line {line}, column {column}: '{value}' is not a number")]
    NotANumber {
        line: u64,
        column: usize,
        value: String,
    },
    #[error("no samples found in trace")]
    Empty,
}

/// One row of a trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSample {
    pub elapsed_ms: f64,
    pub usage: f64,
    pub score: Option<f64>,
}

/// A parsed trace, in file order
#[derive(Debug, Clone, Default)]
pub struct CpuTrace {
    pub samples: Vec<TraceSample>,
}

impl CpuTrace {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Elapsed time axis in seconds
    pub fn times_secs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| ms_to_secs(s.elapsed_ms)).collect()
    }

    /// CPU usage axis in percent
    pub fn usage_percent(&self) -> Vec<f64> {
        self.samples.iter().map(|s| fraction_to_percent(s.usage)).collect()
    }

    /// Score axis in percent, only when every row carries a score
    pub fn score_percent(&self) -> Option<Vec<f64>> {
        self.samples
            .iter()
            .map(|s| s.score.map(fraction_to_percent))
            .collect()
    }
}

/// Load a trace file
pub fn load_trace<P: AsRef<Path>>(path: P, delimiter: Delimiter) -> Result<CpuTrace> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open trace file: {}", path.display()))?;

    let delimiter = match delimiter.byte() {
        Some(b) => b,
        None => {
            let sniffed = sniff_delimiter(&mut file)
                .with_context(|| format!("Failed to read trace file: {}", path.display()))?;
            file.seek(SeekFrom::Start(0))?;
            sniffed
        }
    };
    debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "reading trace");

    let trace = parse_trace(file, delimiter)
        .with_context(|| format!("Failed to parse trace file: {}", path.display()))?;
    Ok(trace)
}

/// Pick tab or comma from the first line that carries data
fn sniff_delimiter<R: Read>(reader: R) -> std::io::Result<u8> {
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        return Ok(if line.contains('\t') { b'\t' } else { b',' });
    }
    Ok(b'\t')
}

/// Parse header-less trace rows from any reader
pub fn parse_trace<R: Read>(reader: R, delimiter: u8) -> Result<CpuTrace> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        samples.push(parse_row(&record, line)?);
    }

    if samples.is_empty() {
        return Err(TraceError::Empty.into());
    }

    Ok(CpuTrace { samples })
}

fn parse_row(record: &StringRecord, line: u64) -> Result<TraceSample, TraceError> {
    if record.len() < 2 {
        return Err(TraceError::TooFewColumns {
            line,
            found: record.len(),
        });
    }

    let field = |column: usize| -> Result<f64, TraceError> {
        let value = &record[column];
        value.parse::<f64>().map_err(|_| TraceError::NotANumber {
            line,
            column: column + 1,
            value: value.to_string(),
        })
    };

    let score = match record.get(2) {
        Some(s) if !s.is_empty() => Some(field(2)?),
        _ => None,
    };

    Ok(TraceSample {
        elapsed_ms: field(0)?,
        usage: field(1)?,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_trace(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn parses_tab_separated_rows_in_order() {
        let trace = parse_trace("0\t0.1\n1500\t0.42\n3000\t1\n".as_bytes(), b'\t').unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.times_secs(), vec![0.0, 1.5, 3.0]);

        let usage = trace.usage_percent();
        assert_relative_eq!(usage[0], 10.0);
        assert_relative_eq!(usage[1], 42.0);
        assert_relative_eq!(usage[2], 100.0);
        assert!(trace.score_percent().is_none());
    }

    #[test]
    fn reads_optional_score_column() {
        let trace = parse_trace("0,0.5,0.25\n1000,0.5,0.75\n".as_bytes(), b',').unwrap();
        let scores = trace.score_percent().unwrap();
        assert_relative_eq!(scores[0], 25.0);
        assert_relative_eq!(scores[1], 75.0);
    }

    #[test]
    fn partial_scores_yield_no_score_series() {
        let trace = parse_trace("0,0.5,0.25\n1000,0.5\n".as_bytes(), b',').unwrap();
        assert_eq!(trace.samples[1].score, None);
        assert!(trace.score_percent().is_none());
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let trace = parse_trace("# time\tusage\n\n0\t0.2\n\n100\t0.3\n".as_bytes(), b'\t').unwrap();
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn reports_malformed_field_with_position() {
        let err = parse_trace("0\t0.1\n10\tabc\n".as_bytes(), b'\t').unwrap_err();
        match err.downcast_ref::<TraceError>() {
            Some(TraceError::NotANumber { line, column, value }) => {
                assert_eq!(*line, 2);
                assert_eq!(*column, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rejects_single_column_rows() {
        let err = parse_trace("0\n".as_bytes(), b'\t').unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TraceError>(),
            Some(TraceError::TooFewColumns { found: 1, .. })
        ));
    }

    #[test]
    fn rejects_empty_trace() {
        let err = parse_trace("# nothing here\n".as_bytes(), b'\t').unwrap_err();
        assert!(matches!(err.downcast_ref::<TraceError>(), Some(TraceError::Empty)));
    }

    #[test]
    fn auto_delimiter_detects_comma() {
        let file = write_trace("# header comment\n0,0.1\n500,0.2\n");
        let trace = load_trace(file.path(), Delimiter::Auto).unwrap();
        assert_eq!(trace.times_secs(), vec![0.0, 0.5]);
    }

    #[test]
    fn auto_delimiter_detects_tab() {
        let file = write_trace("0\t0.1\n500\t0.2\n");
        let trace = load_trace(file.path(), Delimiter::Auto).unwrap();
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn missing_file_mentions_path() {
        let err = load_trace("/nonexistent/trace.tsv", Delimiter::Tab).unwrap_err();
        assert!(format!("{}", err).contains("/nonexistent/trace.tsv"));
    }
}
