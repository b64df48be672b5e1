//! Trend pair: DIF / DEA / histogram.
//!
//! DIF = EMA(close, fast) - EMA(close, slow)
//! DEA = EMA(DIF, signal)
//! Histogram = (DIF - DEA) * 2
//!
//! Both EMAs are seeded by their first input, so every point is valid.
//! Default parameters: fast=12, slow=26, signal=9

use crate::domain::indicator::rolling::ema_series;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::empty(indicator_type);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_series(&closes, fast);
    let ema_slow = ema_series(&closes, slow);
    let dif: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let dea = ema_series(&dif, signal_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Macd {
                dif: dif[i],
                dea: dea[i],
                histogram: (dif[i] - dea[i]) * 2.0,
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// Splits a trend-pair series into (dif, dea, histogram) vectors.
pub fn split_lines(series: &IndicatorSeries) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut dif = Vec::with_capacity(series.len());
    let mut dea = Vec::with_capacity(series.len());
    let mut hist = Vec::with_capacity(series.len());
    for point in &series.values {
        if let IndicatorValue::Macd {
            dif: d,
            dea: e,
            histogram: h,
        } = point.value
        {
            dif.push(d);
            dea.push(e);
            hist.push(h);
        }
    }
    (dif, dea, hist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::from_closes;
    use crate::domain::indicator::calculate_ema;

    fn trending(n: usize) -> Vec<OhlcvBar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        from_closes(&closes)
    }

    #[test]
    fn macd_histogram_is_twice_spread() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 / 4.0).sin() * 5.0).collect();
        let series = calculate_macd(&from_closes(&closes), DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

        for point in &series.values {
            if let IndicatorValue::Macd {
                dif,
                dea,
                histogram,
            } = point.value
            {
                assert!((histogram - (dif - dea) * 2.0).abs() < 1e-12);
            } else {
                panic!("Expected Macd value");
            }
        }
    }

    #[test]
    fn macd_dif_is_ema_fast_minus_ema_slow() {
        let bars = trending(10);
        let series = calculate_macd(&bars, 3, 5, 2);

        let fast = calculate_ema(&bars, 3).primary_values();
        let slow = calculate_ema(&bars, 5).primary_values();
        let (dif, _, _) = split_lines(&series);

        for i in 0..bars.len() {
            assert!(
                (dif[i] - (fast[i] - slow[i])).abs() < 1e-12,
                "DIF mismatch at index {}",
                i
            );
        }
    }

    #[test]
    fn macd_first_point_is_flat() {
        let series = calculate_macd(&trending(5), DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        let (dif, dea, hist) = split_lines(&series);
        assert_eq!((dif[0], dea[0], hist[0]), (0.0, 0.0, 0.0));
        assert!(series.values.iter().all(|p| p.valid));
    }

    #[test]
    fn macd_uptrend_keeps_dif_above_dea() {
        let series = calculate_macd(&trending(40), DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        let (dif, dea, _) = split_lines(&series);
        for i in 1..dif.len() {
            assert!(dif[i] > dea[i], "index {}", i);
        }
    }

    #[test]
    fn macd_indicator_type() {
        let series = calculate_macd(&trending(3), 5, 10, 3);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Macd {
                fast: 5,
                slow: 10,
                signal: 3
            }
        );
    }

    #[test]
    fn macd_zero_period() {
        let bars = trending(3);
        assert!(calculate_macd(&bars, 0, 26, 9).is_empty());
        assert!(calculate_macd(&bars, 12, 0, 9).is_empty());
        assert!(calculate_macd(&bars, 12, 26, 0).is_empty());
    }

    #[test]
    fn macd_default_constants() {
        assert_eq!(DEFAULT_FAST, 12);
        assert_eq!(DEFAULT_SLOW, 26);
        assert_eq!(DEFAULT_SIGNAL, 9);
    }
}
