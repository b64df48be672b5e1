//! BIAS ratio: distance of close from its moving average, in percent.
//!
//! BIAS(n)[i] = (C[i] - MA(n)[i]) / MA(n)[i] * 100, 0 when MA == 0.
//! Warmup: first (n-1) bars invalid.

use crate::domain::indicator::rolling::rolling_mean;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIODS: (usize, usize, usize) = (6, 12, 24);

pub fn calculate_bias(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Bias(period));
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ma = rolling_mean(&closes, period);
    let bias: Vec<f64> = closes
        .iter()
        .zip(&ma)
        .map(|(&c, &m)| if m == 0.0 { 0.0 } else { (c - m) / m * 100.0 })
        .collect();
    IndicatorSeries::from_simple(IndicatorType::Bias(period), bars, &bias, period - 1)
}

/// The conventional short / medium / long BIAS lines.
pub fn calculate_bias_set(
    bars: &[OhlcvBar],
    p1: usize,
    p2: usize,
    p3: usize,
) -> [IndicatorSeries; 3] {
    [
        calculate_bias(bars, p1),
        calculate_bias(bars, p2),
        calculate_bias(bars, p3),
    ]
}
