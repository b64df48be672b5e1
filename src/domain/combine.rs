//! Combination engine: z-score every factor over its own history, then take
//! the weighted mean of the normalised opinions present at each timestamp.
//!
//! Results are joined by exact timestamp through an ordered map. A timestamp
//! only some factors cover still gets a composite, with a lower
//! `factor_count`.

use crate::domain::error::RegimeError;
use crate::domain::factor::{FactorResult, DEGENERATE_STD};
use crate::domain::indicator::rolling::{mean, sample_std};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// What to do with a timestamp whose factors weigh nothing in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroWeightPolicy {
    #[default]
    Fail,
    /// Emit a composite of 0.0.
    Neutral,
}

impl FromStr for ZeroWeightPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ZeroWeightPolicy::Fail),
            "neutral" => Ok(ZeroWeightPolicy::Neutral),
            other => Err(format!("expected 'fail' or 'neutral', got '{}'", other)),
        }
    }
}

impl fmt::Display for ZeroWeightPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroWeightPolicy::Fail => f.write_str("fail"),
            ZeroWeightPolicy::Neutral => f.write_str("neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombineOptions {
    pub zero_weight: ZeroWeightPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    pub timestamp: NaiveDateTime,
    pub composite_score: f64,
    pub factor_count: usize,
}

/// `(x - mean) / std` with the sample std; all zeros when the series is
/// degenerate (std <= 1e-8, or fewer than two points).
pub fn zscore(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let s = sample_std(values);
    if s <= DEGENERATE_STD {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / s).collect()
}

/// Pools every factor's results and replaces each value by its z-score
/// within the history of the same `factor_name`.
pub fn normalize_factors(factor_results: &[Vec<FactorResult>]) -> Vec<FactorResult> {
    let pooled: Vec<&FactorResult> = factor_results.iter().flatten().collect();

    let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, r) in pooled.iter().enumerate() {
        by_name.entry(r.factor_name.as_str()).or_default().push(i);
    }

    let mut normalized: Vec<FactorResult> = pooled.iter().map(|r| (*r).clone()).collect();
    for (name, indices) in &by_name {
        let values: Vec<f64> = indices.iter().map(|&i| pooled[i].value).collect();
        let z = zscore(&values);
        if values.len() > 1 && z.iter().all(|&v| v == 0.0) {
            warn!(
                factor = %name,
                points = values.len(),
                "degenerate factor history, normalised to 0"
            );
        }
        for (&i, zv) in indices.iter().zip(z) {
            normalized[i].value = zv;
        }
    }
    normalized
}

/// Combines factor series into one composite series, ascending by timestamp.
pub fn combine_factors(
    factor_results: &[Vec<FactorResult>],
    options: &CombineOptions,
) -> Result<Vec<CompositeScore>, RegimeError> {
    let normalized = normalize_factors(factor_results);

    let mut groups: BTreeMap<NaiveDateTime, Vec<&FactorResult>> = BTreeMap::new();
    for r in &normalized {
        groups.entry(r.timestamp).or_default().push(r);
    }

    let mut scores = Vec::with_capacity(groups.len());
    for (timestamp, group) in groups {
        let total_weight: f64 = group.iter().map(|r| r.weight).sum();
        let composite_score = if total_weight > 0.0 && total_weight.is_finite() {
            group.iter().map(|r| r.value * r.weight).sum::<f64>() / total_weight
        } else {
            match options.zero_weight {
                ZeroWeightPolicy::Fail => return Err(RegimeError::ZeroWeight { timestamp }),
                ZeroWeightPolicy::Neutral => {
                    warn!(%timestamp, "zero total weight, composite set to 0");
                    0.0
                }
            }
        };
        scores.push(CompositeScore {
            timestamp,
            composite_score,
            factor_count: group.len(),
        });
    }

    debug!(
        factors = factor_results.len(),
        timestamps = scores.len(),
        "factors combined"
    );
    Ok(scores)
}

// --- Correlation diagnostic ------------------------------------------------

/// Pairwise Pearson correlation between factor value series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// `values[i][j]` pairs `names[i]` with `names[j]`; `None` when the pair
    /// shares fewer than two timestamps or either side is flat.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        self.values[i][j]
    }
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (mx, my) = (mean(xs), mean(ys));
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    let denom = (vx * vy).sqrt();
    if vx.sqrt() <= DEGENERATE_STD || vy.sqrt() <= DEGENERATE_STD || denom == 0.0 {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Correlation of raw factor values over the timestamps each pair shares.
/// Empty unless at least two distinct factors have data.
pub fn factor_correlation(factor_results: &[Vec<FactorResult>]) -> CorrelationMatrix {
    let mut names: Vec<String> = Vec::new();
    let mut series: BTreeMap<&str, BTreeMap<NaiveDateTime, f64>> = BTreeMap::new();
    for r in factor_results.iter().flatten() {
        if !series.contains_key(r.factor_name.as_str()) {
            names.push(r.factor_name.clone());
        }
        series
            .entry(r.factor_name.as_str())
            .or_default()
            .insert(r.timestamp, r.value);
    }
    if names.len() < 2 {
        return CorrelationMatrix::default();
    }

    let values = names
        .iter()
        .map(|a| {
            names
                .iter()
                .map(|b| {
                    let (sa, sb) = (&series[a.as_str()], &series[b.as_str()]);
                    let (xs, ys): (Vec<f64>, Vec<f64>) = sa
                        .iter()
                        .filter_map(|(t, &x)| sb.get(t).map(|&y| (x, y)))
                        .unzip();
                    pearson(&xs, &ys)
                })
                .collect()
        })
        .collect();

    CorrelationMatrix { names, values }
}

// --- Summary -----------------------------------------------------------------

/// Distribution of a composite series. The 70th and 30th percentiles serve
/// as candidate buy and sell thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sell_threshold: f64,
    pub buy_threshold: f64,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[CompositeScore]) -> Option<Self> {
        let mut values: Vec<f64> = scores.iter().map(|s| s.composite_score).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        Some(Self {
            count: values.len(),
            min: values[0],
            max: values[values.len() - 1],
            mean: mean(&values),
            sell_threshold: percentile(&values, 30.0),
            buy_threshold: percentile(&values, 70.0),
        })
    }
}

/// Percentile `q` (0..=100) of sorted data, linearly interpolated between
/// the closest ranks.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::minute;
    use approx::assert_relative_eq;

    fn series(name: &str, weight: f64, values: &[(usize, f64)]) -> Vec<FactorResult> {
        values
            .iter()
            .map(|&(t, value)| FactorResult {
                factor_name: name.to_string(),
                timestamp: minute(t),
                value,
                weight,
            })
            .collect()
    }

    #[test]
    fn zscore_mean_zero_std_one() {
        let z = zscore(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        assert_relative_eq!(mean(&z), 0.0, epsilon = 1e-12);
        assert_relative_eq!(sample_std(&z), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zscore_degenerate_is_zero() {
        assert_eq!(zscore(&[3.0, 3.0, 3.0]), vec![0.0; 3]);
        assert_eq!(zscore(&[3.0]), vec![0.0]);
        assert!(zscore(&[]).is_empty());
    }

    #[test]
    fn single_factor_composite_is_its_zscore() {
        let a = series("a", 2.0, &[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let out = combine_factors(&[a], &CombineOptions::default()).unwrap();
        assert_eq!(out.len(), 3);
        assert_relative_eq!(out[0].composite_score, -1.0, epsilon = 1e-12);
        assert_relative_eq!(out[1].composite_score, 0.0, epsilon = 1e-12);
        assert_relative_eq!(out[2].composite_score, 1.0, epsilon = 1e-12);
        assert!(out.iter().all(|s| s.factor_count == 1));
    }

    #[test]
    fn weighted_mean_of_normalised_values() {
        let a = series("a", 3.0, &[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let b = series("b", 1.0, &[(0, 30.0), (1, 20.0), (2, 10.0)]);
        let out = combine_factors(&[a, b], &CombineOptions::default()).unwrap();
        // z(a) = -1, 0, 1 and z(b) = 1, 0, -1
        assert_relative_eq!(out[0].composite_score, (-3.0 + 1.0) / 4.0, epsilon = 1e-12);
        assert_relative_eq!(out[2].composite_score, (3.0 - 1.0) / 4.0, epsilon = 1e-12);
        assert!(out.iter().all(|s| s.factor_count == 2));
    }

    #[test]
    fn misaligned_timestamps_give_partial_groups() {
        let a = series("a", 1.0, &[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let b = series("b", 1.0, &[(2, 5.0), (3, 7.0)]);
        let out = combine_factors(&[b, a], &CombineOptions::default()).unwrap();
        let counts: Vec<usize> = out.iter().map(|s| s.factor_count).collect();
        assert_eq!(counts, vec![1, 1, 2, 1]);
        let times: Vec<NaiveDateTime> = out.iter().map(|s| s.timestamp).collect();
        assert_eq!(times, (0..4).map(minute).collect::<Vec<_>>());
    }

    #[test]
    fn constant_factor_contributes_zero() {
        let a = series("a", 1.0, &[(0, 5.0), (1, 5.0)]);
        let out = combine_factors(&[a], &CombineOptions::default()).unwrap();
        assert!(out.iter().all(|s| s.composite_score == 0.0));
    }

    #[test]
    fn zero_weight_fails_by_default() {
        let a = series("a", 0.0, &[(0, 1.0), (1, 2.0)]);
        let err = combine_factors(&[a], &CombineOptions::default()).unwrap_err();
        assert!(matches!(err, RegimeError::ZeroWeight { timestamp } if timestamp == minute(0)));
    }

    #[test]
    fn zero_weight_neutral_policy() {
        let a = series("a", 0.0, &[(0, 1.0), (1, 2.0)]);
        let b = series("b", 1.0, &[(1, 4.0), (2, 8.0)]);
        let options = CombineOptions {
            zero_weight: ZeroWeightPolicy::Neutral,
        };
        let out = combine_factors(&[a, b], &options).unwrap();
        assert_eq!(out[0].composite_score, 0.0);
        assert_eq!(out[0].factor_count, 1);
        // the zero-weight factor does not pull the mean
        assert_relative_eq!(out[1].composite_score, -1.0 / 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn duplicated_factor_with_half_weight_is_idempotent() {
        let values = [(0, 0.3), (1, -0.2), (2, 0.9), (3, 0.1)];
        let single = combine_factors(&[series("a", 2.0, &values)], &CombineOptions::default())
            .unwrap();
        let doubled = combine_factors(
            &[series("a", 1.0, &values), series("a_copy", 1.0, &values)],
            &CombineOptions::default(),
        )
        .unwrap();
        for (s, d) in single.iter().zip(&doubled) {
            assert_relative_eq!(s.composite_score, d.composite_score, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_weight_policy_parses() {
        assert_eq!("fail".parse::<ZeroWeightPolicy>(), Ok(ZeroWeightPolicy::Fail));
        assert_eq!(" Neutral ".parse::<ZeroWeightPolicy>(), Ok(ZeroWeightPolicy::Neutral));
        assert!("skip".parse::<ZeroWeightPolicy>().is_err());
        assert_eq!(ZeroWeightPolicy::Neutral.to_string(), "neutral");
    }

    #[test]
    fn correlation_needs_two_factors() {
        let a = series("a", 1.0, &[(0, 1.0), (1, 2.0)]);
        assert!(factor_correlation(&[a.clone()]).is_empty());
        assert!(factor_correlation(&[a, Vec::new()]).is_empty());
    }

    #[test]
    fn correlation_over_shared_timestamps() {
        let a = series("a", 1.0, &[(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0)]);
        let b = series("b", 1.0, &[(1, 8.0), (2, 6.0), (3, 4.0), (4, 100.0)]);
        let flat = series("flat", 1.0, &[(0, 1.0), (1, 1.0), (2, 1.0)]);
        let m = factor_correlation(&[a, b, flat]);

        assert_eq!(m.names, vec!["a", "b", "flat"]);
        assert_relative_eq!(m.get("a", "b").unwrap(), -1.0, epsilon = 1e-12);
        assert_relative_eq!(m.get("a", "a").unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(m.get("a", "flat"), None);
        assert_eq!(m.get("a", "missing"), None);
    }

    #[test]
    fn pearson_short_input() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        // cov 5, sum of squares 2 and 38/3
        let expected = 5.0 / (2.0f64 * 38.0 / 3.0).sqrt();
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 7.0]).unwrap();
        assert_relative_eq!(r, expected, epsilon = 1e-12);
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&sorted, 30.0), 2.2, epsilon = 1e-12);
        assert_relative_eq!(percentile(&sorted, 70.0), 3.8, epsilon = 1e-12);
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 5.0);
        assert_eq!(percentile(&[7.0], 30.0), 7.0);
    }

    #[test]
    fn summary_of_scores() {
        let scores: Vec<CompositeScore> = [0.5, -1.0, 2.0, 0.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| CompositeScore {
                timestamp: minute(i),
                composite_score: v,
                factor_count: 1,
            })
            .collect();
        let summary = ScoreSummary::from_scores(&scores).unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.min, -1.0);
        assert_eq!(summary.max, 2.0);
        assert_relative_eq!(summary.mean, 0.5);
        // sorted: -1, 0, 0.5, 1, 2
        assert_relative_eq!(summary.sell_threshold, 0.1, epsilon = 1e-12);
        assert_relative_eq!(summary.buy_threshold, 0.9, epsilon = 1e-12);
        assert!(ScoreSummary::from_scores(&[]).is_none());
    }
}
