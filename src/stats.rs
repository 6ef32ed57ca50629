//! Descriptive and order statistics over sample values.
//!
//! This module provides the pure computation core used by both the
//! historical and realtime paths:
//! - Descriptive statistics (mean, variance, standard deviation)
//! - Order statistics (median, mode, quantiles via linear interpolation)
//! - Empirical CDF construction with a chart-friendly downsampling policy
//!
//! Every function is total: degenerate input (empty or single-element
//! slices) yields a well-defined zero/empty result instead of an error.
//! The one diagnostic case is [`quantile`] with a probability outside
//! `[0, 1]`, which logs a warning and returns `0.0`.

use serde::Serialize;
use tracing::warn;

/// Descriptive statistics for one set of values.
///
/// `variance` uses the population divisor `n` unless `sample` is set, in
/// which case the `n - 1` divisor applies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatsSummary {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub sum: f64,
    pub sample: bool,
}

/// One point on an empirical CDF curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CdfPoint {
    pub value: f64,
    pub probability: f64,
}

/// Order-statistics summary accompanying a CDF curve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CdfSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    pub range: f64,
}

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance; `0.0` when fewer than two values are present.
pub fn variance(values: &[f64], sample: bool) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    let divisor = if sample { n - 1 } else { n };
    sum_sq / divisor as f64
}

/// Standard deviation, the square root of [`variance`].
pub fn std_dev(values: &[f64], sample: bool) -> f64 {
    variance(values, sample).sqrt()
}

/// Computes the full [`StatsSummary`] without sorting the input.
/// All-zero summary for an empty slice.
pub fn all_stats(values: &[f64], sample: bool) -> StatsSummary {
    if values.is_empty() {
        return StatsSummary { sample, ..StatsSummary::default() };
    }

    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = variance(values, sample);

    StatsSummary {
        count,
        mean,
        variance,
        std_dev: variance.sqrt(),
        min,
        max,
        range: max - min,
        sum,
        sample,
    }
}

/// Median; the mean of the two central order statistics for even `n`.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// Most frequent value(s), ascending.
///
/// Returns an empty vec when every value is equally frequent (including
/// the all-distinct case). That conflates "no mode" with "every value is
/// a mode", but downstream consumers rely on the empty result, so the
/// behavior is kept.
pub fn mode(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let sorted = sorted(values);
    let mut runs: Vec<(f64, usize)> = Vec::new();
    for &v in &sorted {
        match runs.last_mut() {
            Some((value, count)) if *value == v => *count += 1,
            _ => runs.push((v, 1)),
        }
    }

    let max_freq = runs.iter().map(|&(_, c)| c).max().unwrap_or(0);
    if runs.iter().all(|&(_, c)| c == max_freq) {
        return Vec::new();
    }
    runs.into_iter()
        .filter(|&(_, c)| c == max_freq)
        .map(|(v, _)| v)
        .collect()
}

/// Quantile by linear interpolation between order statistics at position
/// `p * (n - 1)` (the R-7 method).
///
/// A probability outside `[0, 1]` is an invalid argument: the call logs a
/// warning and returns `0.0` so chart code never sees a hole.
pub fn quantile(values: &[f64], probability: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if !(0.0..=1.0).contains(&probability) {
        warn!(probability, "quantile probability must be within [0, 1]");
        return 0.0;
    }

    let sorted = sorted(values);
    let pos = probability * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = pos - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Empirical CDF: for the element of rank `i` (0-based, ascending),
/// `probability = (i + 1) / n`. The largest value always maps to `1.0`.
pub fn empirical_cdf(values: &[f64]) -> Vec<CdfPoint> {
    let sorted = sorted(values);
    let n = sorted.len();
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, value)| CdfPoint { value, probability: (i + 1) as f64 / n as f64 })
        .collect()
}

/// Downsampled CDF for chart rendering.
///
/// The full curve is returned unchanged when it already fits in
/// `max_points`. Otherwise every `ceil(len / max_points)`-th point is
/// kept and the final point is force-included, so the result holds at
/// most `max_points + 1` entries and stays monotonic in both value and
/// probability.
pub fn downsample_cdf(values: &[f64], max_points: usize) -> Vec<CdfPoint> {
    let cdf = empirical_cdf(values);
    let max_points = max_points.max(1);
    if cdf.len() <= max_points {
        return cdf;
    }

    let step = cdf.len().div_ceil(max_points);
    let mut result: Vec<CdfPoint> = cdf.iter().copied().step_by(step).collect();

    let last = cdf[cdf.len() - 1];
    if result.last().map(|p| p.probability) != Some(last.probability) {
        result.push(last);
    }
    result
}

/// Combined order-statistics summary: descriptive stats plus median and
/// quartiles. All-zero summary for an empty slice.
pub fn cdf_summary(values: &[f64]) -> CdfSummary {
    if values.is_empty() {
        return CdfSummary::default();
    }

    let stats = all_stats(values, false);
    CdfSummary {
        count: stats.count,
        mean: stats.mean,
        median: median(values),
        std_dev: stats.std_dev,
        min: stats.min,
        max: stats.max,
        q1: quantile(values, 0.25),
        q3: quantile(values, 0.75),
        range: stats.range,
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
