//! KDJ stochastic oscillator.
//!
//! RSV = (C - lowest low over n) / (highest high over n - lowest low over n) * 100
//! K = EMA(RSV, alpha = 1/m1), D = EMA(K, alpha = 1/m2), J = 3K - 2D
//!
//! K and D are seeded with their first defined input at index n-1.
//! A zero high-low range gives RSV = 0.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::rolling::{ema_series_alpha, rolling_max, rolling_min};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_N: usize = 9;
pub const DEFAULT_M1: usize = 3;
pub const DEFAULT_M2: usize = 3;

pub fn calculate_kdj(bars: &[OhlcvBar], n: usize, m1: usize, m2: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Kdj { n, m1, m2 };
    if n == 0 || m1 == 0 || m2 == 0 || bars.is_empty() {
        return IndicatorSeries::empty(indicator_type);
    }
    let warmup = n - 1;
    if bars.len() <= warmup {
        return invalid_series(indicator_type, bars);
    }

    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lowest = rolling_min(&lows, n);
    let highest = rolling_max(&highs, n);

    let rsv: Vec<f64> = (warmup..bars.len())
        .map(|i| {
            let range = highest[i] - lowest[i];
            if range == 0.0 {
                0.0
            } else {
                (bars[i].close - lowest[i]) / range * 100.0
            }
        })
        .collect();

    let k = ema_series_alpha(&rsv, 1.0 / m1 as f64);
    let d = ema_series_alpha(&k, 1.0 / m2 as f64);

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let value = if i < warmup {
            IndicatorValue::Kdj {
                k: 0.0,
                d: 0.0,
                j: 0.0,
            }
        } else {
            let (kv, dv) = (k[i - warmup], d[i - warmup]);
            IndicatorValue::Kdj {
                k: kv,
                d: dv,
                j: 3.0 * kv - 2.0 * dv,
            }
        };
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: i >= warmup,
            value,
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn invalid_series(indicator_type: IndicatorType, bars: &[OhlcvBar]) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type,
        values: bars
            .iter()
            .map(|b| IndicatorPoint {
                timestamp: b.timestamp,
                valid: false,
                value: IndicatorValue::Kdj {
                    k: 0.0,
                    d: 0.0,
                    j: 0.0,
                },
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::{from_closes, from_ohlc};

    fn kdj_at(series: &IndicatorSeries, i: usize) -> (f64, f64, f64) {
        match series.values[i].value {
            IndicatorValue::Kdj { k, d, j } => (k, d, j),
            _ => panic!("Expected Kdj value"),
        }
    }

    #[test]
    fn kdj_warmup() {
        let bars = from_ohlc(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 12.0, 9.5, 11.0),
            (11.0, 13.0, 10.0, 12.5),
            (12.0, 14.0, 11.0, 13.0),
        ]);
        let series = calculate_kdj(&bars, 3, 3, 3);
        assert_eq!(series.len(), 4);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn kdj_seed_is_first_rsv() {
        let bars = from_ohlc(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 12.0, 9.5, 11.0),
            (11.0, 13.0, 10.0, 12.5),
            (12.0, 14.0, 11.0, 13.0),
        ]);
        let series = calculate_kdj(&bars, 3, 3, 3);

        // window 0..=2: low 9, high 13
        let rsv2 = (12.5 - 9.0) / (13.0 - 9.0) * 100.0;
        let (k, d, j) = kdj_at(&series, 2);
        assert!((k - rsv2).abs() < 1e-9);
        assert!((d - rsv2).abs() < 1e-9);
        assert!((j - rsv2).abs() < 1e-9);

        // window 1..=3: low 9.5, high 14
        let rsv3 = (13.0 - 9.5) / (14.0 - 9.5) * 100.0;
        let k3 = rsv3 / 3.0 + k * 2.0 / 3.0;
        let d3 = k3 / 3.0 + d * 2.0 / 3.0;
        let (k, d, j) = kdj_at(&series, 3);
        assert!((k - k3).abs() < 1e-9);
        assert!((d - d3).abs() < 1e-9);
        assert!((j - (3.0 * k3 - 2.0 * d3)).abs() < 1e-9);
    }

    #[test]
    fn kdj_flat_range_is_zero() {
        let series = calculate_kdj(&from_closes(&[5.0; 12]), 9, 3, 3);
        assert_eq!(series.valid_count(), 4);
        for i in 8..12 {
            assert_eq!(kdj_at(&series, i), (0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn kdj_short_series_is_all_invalid() {
        let series = calculate_kdj(&from_closes(&[1.0, 2.0]), 9, 3, 3);
        assert_eq!(series.len(), 2);
        assert_eq!(series.valid_count(), 0);
    }

    #[test]
    fn kdj_zero_parameter() {
        let bars = from_closes(&[1.0, 2.0, 3.0]);
        assert!(calculate_kdj(&bars, 0, 3, 3).is_empty());
        assert!(calculate_kdj(&bars, 3, 0, 3).is_empty());
    }
}
