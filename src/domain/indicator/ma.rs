//! Simple Moving Average of close.
//!
//! MA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::rolling::rolling_mean;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Ma(period));
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ma = rolling_mean(&closes, period);
    IndicatorSeries::from_simple(IndicatorType::Ma(period), bars, &ma, period - 1)
}
