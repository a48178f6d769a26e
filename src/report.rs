//! Quantile summary of a dataset, printed next to the histogram.

use crate::stats::{quantile, StatsError};
use crate::workbook::Dataset;
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use std::fmt;

/// Quantiles of one column, in the same order as `QuantileReport::quantiles`
#[derive(Debug, Clone, Serialize)]
pub struct ColumnQuantiles {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuantileReport {
    pub rows: usize,
    pub quantiles: Vec<f64>,
    pub columns: Vec<ColumnQuantiles>,
}

impl QuantileReport {
    pub fn compute(dataset: &Dataset, quantiles: &[f64]) -> Result<Self, StatsError> {
        let mut columns = Vec::with_capacity(dataset.columns.len());
        for column in &dataset.columns {
            let values = quantiles
                .iter()
                .map(|&q| quantile(&column.values, q))
                .collect::<Result<Vec<_>, _>>()?;
            columns.push(ColumnQuantiles {
                name: column.name.clone(),
                values,
            });
        }

        Ok(Self {
            rows: dataset.rows,
            quantiles: quantiles.to_vec(),
            columns,
        })
    }
}

impl fmt::Display for QuantileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows", self.rows.to_formatted_string(&Locale::en))?;
        let width = self
            .columns
            .iter()
            .map(|c| c.name.chars().count())
            .max()
            .unwrap_or(0);

        for (i, q) in self.quantiles.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}% quantile", (q * 10000.0).round() / 100.0)?;
            for column in &self.columns {
                match column.values.get(i).copied().flatten() {
                    Some(v) => writeln!(f, "  {:<width$}  {:.6}", column.name, v, width = width)?,
                    None => writeln!(f, "  {:<width$}  NaN", column.name, width = width)?,
                }
            }
        }
        Ok(())
    }
}
