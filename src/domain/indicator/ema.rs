//! Exponential Moving Average of close.
//!
//! k = 2/(n+1), EMA[0] = C[0], then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Seeded by the first close, so there is no warmup gap.

use crate::domain::indicator::rolling::ema_series;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Ema(period));
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema = ema_series(&closes, period);
    IndicatorSeries::from_simple(IndicatorType::Ema(period), bars, &ema, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::from_closes;
    use crate::domain::indicator::IndicatorValue;

    #[test]
    fn ema_valid_from_first_bar() {
        let bars = from_closes(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 5);
        assert!(series.values.iter().all(|p| p.valid));
    }

    #[test]
    fn ema_seed_is_first_close() {
        let bars = from_closes(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 3);

        if let IndicatorValue::Simple(v) = series.values[0].value {
            assert!((v - 10.0).abs() < f64::EPSILON);
        } else {
            panic!("Expected Simple value");
        }
    }

    #[test]
    fn ema_recursive_calculation() {
        let bars = from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        let k = 2.0 / 4.0;
        let mut expected = 10.0;
        for (i, close) in [10.0, 20.0, 30.0, 40.0, 50.0].iter().enumerate().skip(1) {
            expected = close * k + expected * (1.0 - k);
            assert!((series.values[i].value.primary() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn ema_period_1() {
        let bars = from_closes(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 1);
        assert_eq!(series.primary_values(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn ema_indicator_type() {
        let bars = from_closes(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 5);
        assert_eq!(series.indicator_type, IndicatorType::Ema(5));
    }

    #[test]
    fn ema_empty_bars() {
        assert!(calculate_ema(&[], 3).is_empty());
    }
}
