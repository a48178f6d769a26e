//! Small numeric helpers shared by the figures: unit conversions, axis label
//! formatting, histogram binning and quantiles.

use thiserror::Error;

/// Errors from the numeric helpers
#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("bin step must be a positive finite number, got {0}")]
    InvalidStep(f64),
    #[error("maximum value must be finite, got {0}")]
    InvalidMaximum(f64),
    #[error("quantile must be within 0..=1, got {0}")]
    InvalidQuantile(f64),
}

/// Convert milliseconds to seconds
pub fn ms_to_secs(ms: f64) -> f64 {
    ms / 1000.0
}

/// Convert a 0..1 fraction to a 0..100 percentage
pub fn fraction_to_percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// Format a second value as `mm:ss`.
///
/// Total seconds are rounded half away from zero before splitting, so the
/// seconds part never reads `60`.
pub fn format_min_sec(secs: f64) -> String {
    let total = secs.round();
    let sign = if total < 0.0 { "-" } else { "" };
    let total = total.abs() as u64;
    format!("{}{:02}:{:02}", sign, total / 60, total % 60)
}

/// Format a value already on the 0..100 scale as a percentage label
pub fn format_percent(value: f64) -> String {
    // avoid "-0%"
    let rounded = value.round();
    if rounded == 0.0 {
        return "0%".to_string();
    }
    format!("{:.0}%", rounded)
}

/// Format a 0..1 fraction as a percentage label, keeping one decimal when
/// the value is not a whole percent.
pub fn format_fraction_percent(fraction: f64) -> String {
    let pct = fraction_to_percent(fraction);
    if (pct - pct.round()).abs() < 1e-9 {
        format_percent(pct)
    } else {
        format!("{:.1}%", pct)
    }
}

/// Histogram bin edges `0, step, 2*step, ...` up to the first edge at or
/// beyond `max`.
pub fn bin_edges(max: f64, step: f64) -> Result<Vec<f64>, StatsError> {
    if !step.is_finite() || step <= 0.0 {
        return Err(StatsError::InvalidStep(step));
    }
    if !max.is_finite() {
        return Err(StatsError::InvalidMaximum(max));
    }

    let max = max.max(0.0);
    let bins = (max / step).ceil() as usize;
    let mut edges: Vec<f64> = (0..=bins).map(|i| i as f64 * step).collect();

    // i * step may land just short of max
    while edges.last().is_some_and(|&last| last < max) || edges.len() < 2 {
        let next = edges.len() as f64 * step;
        edges.push(next);
    }

    Ok(edges)
}

/// Count values per bin. Bins are half-open `[a, b)` except the last one,
/// which also includes its right edge. Values outside the edges are dropped.
pub fn histogram_counts(values: &[f64], edges: &[f64]) -> Vec<u64> {
    if edges.len() < 2 {
        return Vec::new();
    }

    let mut counts = vec![0u64; edges.len() - 1];
    let first = edges[0];
    let last = edges[edges.len() - 1];

    for &v in values {
        if v.is_nan() || v < first || v > last {
            continue;
        }
        let idx = if v == last {
            counts.len() - 1
        } else {
            // first edge strictly greater than v, minus one
            edges.partition_point(|&e| e <= v) - 1
        };
        counts[idx] += 1;
    }

    counts
}

/// Quantile with linear interpolation between the closest ranks.
/// NaNs are ignored; returns `None` for empty input.
pub fn quantile(values: &[f64], q: f64) -> Result<Option<f64>, StatsError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(StatsError::InvalidQuantile(q));
    }

    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Ok(None);
    }
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Ok(Some(sorted[lo]));
    }
    let t = pos - lo as f64;
    Ok(Some(sorted[lo] + (sorted[hi] - sorted[lo]) * t))
}

/// Autoscaled axis range with a 5% margin on both ends
pub fn padded_range(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span <= 0.0 {
        // a single value: widen around it
        let pad = if min == 0.0 { 0.5 } else { min.abs() * 0.05 };
        return (min - pad, max + pad);
    }
    let pad = span * 0.05;
    (min - pad, max + pad)
}

/// Minimum and maximum of a slice, ignoring NaNs
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_conversions() {
        assert_relative_eq!(ms_to_secs(1500.0), 1.5);
        assert_relative_eq!(fraction_to_percent(0.42), 42.0);
    }

    #[test]
    fn min_sec_labels() {
        assert_eq!(format_min_sec(0.0), "00:00");
        assert_eq!(format_min_sec(65.0), "01:05");
        assert_eq!(format_min_sec(599.4), "09:59");
        assert_eq!(format_min_sec(599.5), "10:00");
        assert_eq!(format_min_sec(599.6), "10:00");
        assert_eq!(format_min_sec(3600.0), "60:00");
        assert_eq!(format_min_sec(-5.0), "-00:05");
    }

    #[test]
    fn percent_labels() {
        assert_eq!(format_percent(42.0), "42%");
        assert_eq!(format_percent(-0.2), "0%");
        assert_eq!(format_percent(100.0), "100%");
        assert_eq!(format_fraction_percent(0.05), "5%");
        assert_eq!(format_fraction_percent(0.025), "2.5%");
    }

    #[test]
    fn bin_edges_cover_maximum_with_uniform_spacing() {
        let edges = bin_edges(1.0, 0.005).unwrap();
        assert_eq!(edges[0], 0.0);
        assert!(*edges.last().unwrap() >= 1.0);
        for pair in edges.windows(2) {
            assert_relative_eq!(pair[1] - pair[0], 0.005, epsilon = 1e-12);
        }
        // no more than one spare bin past the maximum
        assert!(*edges.last().unwrap() < 1.0 + 2.0 * 0.005);
    }

    #[test]
    fn bin_edges_for_zero_maximum_still_has_one_bin() {
        assert_eq!(bin_edges(0.0, 0.5).unwrap(), vec![0.0, 0.5]);
    }

    #[test]
    fn bin_edges_reject_bad_step() {
        assert_eq!(bin_edges(1.0, 0.0), Err(StatsError::InvalidStep(0.0)));
        assert!(bin_edges(1.0, f64::NAN).is_err());
        assert!(bin_edges(f64::INFINITY, 0.1).is_err());
    }

    #[test]
    fn histogram_last_bin_is_closed() {
        let edges = [0.0, 1.0, 2.0, 3.0];
        let counts = histogram_counts(&[0.0, 0.5, 1.0, 2.9, 3.0, 3.1, -0.1], &edges);
        assert_eq!(counts, vec![2, 1, 2]);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&values, 0.0).unwrap(), Some(1.0));
        assert_eq!(quantile(&values, 1.0).unwrap(), Some(4.0));
        assert_relative_eq!(quantile(&values, 0.5).unwrap().unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 0.75).unwrap().unwrap(), 3.25);
        assert_relative_eq!(quantile(&values, 0.9).unwrap().unwrap(), 3.7);
    }

    #[test]
    fn quantile_edge_cases() {
        assert_eq!(quantile(&[], 0.5).unwrap(), None);
        assert_eq!(quantile(&[f64::NAN, 2.0], 0.5).unwrap(), Some(2.0));
        assert_eq!(quantile(&[1.0], 1.5), Err(StatsError::InvalidQuantile(1.5)));
    }

    #[test]
    fn padded_range_adds_margin() {
        let (lo, hi) = padded_range(0.0, 100.0);
        assert_relative_eq!(lo, -5.0);
        assert_relative_eq!(hi, 105.0);
        let (lo, hi) = padded_range(0.0, 0.0);
        assert!(lo < 0.0 && hi > 0.0);
    }

    #[test]
    fn min_max_skips_nan() {
        assert_eq!(min_max(&[3.0, f64::NAN, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(min_max(&[]), None);
    }
}
