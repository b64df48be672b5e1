//! CCI (Commodity Channel Index).
//!
//! TP = (H + L + C) / 3
//! MA = mean of TP over the last n bars
//! MD = mean of |TP[j] - MA| over the same window
//! CCI = (TP - MA) / (0.015 * MD), 0 when MD is zero up to rounding.
//!
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::rolling::mean;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

const LAMBERT: f64 = 0.015;

pub fn calculate_cci(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Cci(period));
    }

    let tp: Vec<f64> = bars.iter().map(OhlcvBar::typical_price).collect();
    let mut cci = vec![0.0; bars.len()];

    for i in (period - 1)..bars.len() {
        let window = &tp[i + 1 - period..=i];
        let ma = mean(window);
        let md = window.iter().map(|v| (v - ma).abs()).sum::<f64>() / period as f64;
        cci[i] = if md <= f64::EPSILON * ma.abs().max(1.0) {
            0.0
        } else {
            (tp[i] - ma) / (LAMBERT * md)
        };
    }

    IndicatorSeries::from_simple(IndicatorType::Cci(period), bars, &cci, period - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::{from_closes, from_ohlc};

    #[test]
    fn cci_warmup() {
        let series = calculate_cci(&from_closes(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn cci_known_window() {
        // TP = close for flat bars: 10, 20, 30 -> MA 20, MD 20/3
        let series = calculate_cci(&from_closes(&[10.0, 20.0, 30.0]), 3);
        let expected = (30.0 - 20.0) / (0.015 * (20.0 / 3.0));
        assert!((series.values[2].value.primary() - expected).abs() < 1e-9);
    }

    #[test]
    fn cci_uses_typical_price() {
        let bars = from_ohlc(&[
            (10.0, 12.0, 8.0, 10.0),
            (10.0, 13.0, 9.0, 11.0),
            (11.0, 18.0, 10.0, 17.0),
        ]);
        let series = calculate_cci(&bars, 3);
        let tp = [10.0, 11.0, 15.0];
        let ma = (10.0 + 11.0 + 15.0) / 3.0;
        let md = tp.iter().map(|v: &f64| (v - ma).abs()).sum::<f64>() / 3.0;
        let expected = (15.0 - ma) / (0.015 * md);
        assert!((series.values[2].value.primary() - expected).abs() < 1e-9);
    }

    #[test]
    fn cci_flat_is_zero() {
        let series = calculate_cci(&from_closes(&[42.0; 10]), 5);
        assert!(series.primary_values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn cci_flat_fractional_price_is_zero() {
        let series = calculate_cci(&from_closes(&[10.1; 30]), 20);
        assert!(series
            .values
            .iter()
            .filter(|p| p.valid)
            .all(|p| p.value.primary() == 0.0));
        assert_eq!(series.values.iter().filter(|p| p.valid).count(), 11);
    }

    #[test]
    fn cci_zero_period() {
        assert!(calculate_cci(&from_closes(&[1.0]), 0).is_empty());
    }
}
