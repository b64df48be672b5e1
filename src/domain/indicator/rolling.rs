//! Shared window and smoothing helpers for the indicator modules.
//!
//! Rolling helpers return a vector of the input's length; entries before the
//! first full window are 0.0 and the caller marks them invalid.

/// Mean over a trailing window of `period` values, recomputed per window
/// so a flat window returns its value exactly.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        out[i] = mean(&values[i + 1 - period..=i]);
    }
    out
}

/// Sample standard deviation (divides by `period - 1`) over a trailing
/// window. Recomputed per window; running sums lose precision on long
/// price series.
pub fn rolling_sample_std(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    if period < 2 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        out[i] = sample_std(&values[i + 1 - period..=i]);
    }
    out
}

pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling_fold(values, period, f64::INFINITY, f64::min)
}

pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling_fold(values, period, f64::NEG_INFINITY, f64::max)
}

fn rolling_fold(values: &[f64], period: usize, init: f64, f: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        out[i] = values[i + 1 - period..=i].iter().copied().fold(init, f);
    }
    out
}

/// EMA with span smoothing, `alpha = 2 / (span + 1)`.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return vec![0.0; values.len()];
    }
    ema_series_alpha(values, 2.0 / (span as f64 + 1.0))
}

/// Recursive EMA seeded with the first value:
/// `out[0] = v[0]`, `out[i] = out[i-1] + alpha * (v[i] - out[i-1])`.
pub fn ema_series_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => p + alpha * (v - p),
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Arithmetic mean accumulated as offsets from the first value; identical
/// inputs give that value back without rounding.
pub fn mean(values: &[f64]) -> f64 {
    let Some(&base) = values.first() else {
        return 0.0;
    };
    base + values.iter().map(|v| v - base).sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0.0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}
