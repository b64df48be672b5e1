//! RSI (Relative Strength Index).
//!
//! Gains and losses of close-to-close changes are each smoothed with an EMA
//! of span n (seeded at the first bar, whose change is 0):
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, unless avg_gain is also 0 (flat window),
//! which yields the neutral 50.
//!
//! Warmup: first n bars are invalid.

use crate::domain::indicator::rolling::ema_series;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const NEUTRAL_RSI: f64 = 50.0;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Rsi(period));
    }

    let mut gains = Vec::with_capacity(bars.len());
    let mut losses = Vec::with_capacity(bars.len());
    gains.push(0.0);
    losses.push(0.0);
    for w in bars.windows(2) {
        let change = w[1].close - w[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gains = ema_series(&gains, period);
    let avg_losses = ema_series(&losses, period);

    let rsi: Vec<f64> = avg_gains
        .iter()
        .zip(&avg_losses)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect();

    IndicatorSeries::from_simple(IndicatorType::Rsi(period), bars, &rsi, period)
}

pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { NEUTRAL_RSI } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::from_closes;
    use crate::domain::indicator::IndicatorValue;

    #[test]
    fn rsi_empty_bars() {
        assert_eq!(calculate_rsi(&[], 14).len(), 0);
    }

    #[test]
    fn rsi_single_bar() {
        let series = calculate_rsi(&from_closes(&[100.0]), 14);
        assert_eq!(series.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&from_closes(&closes), 14);

        assert_eq!(series.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
            assert_eq!(series.values[i].value.primary(), 0.0);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&from_closes(&closes), 14);

        if let IndicatorValue::Simple(rsi) = series.values[29].value {
            assert!((rsi - 100.0).abs() < f64::EPSILON, "RSI should be 100 when all gains");
        } else {
            panic!("Expected Simple value");
        }
    }

    #[test]
    fn rsi_all_losses_is_near_zero() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&from_closes(&closes), 14);
        assert!(series.values[29].value.primary().abs() < 1e-9);
    }

    #[test]
    fn rsi_flat_is_neutral() {
        let series = calculate_rsi(&from_closes(&[50.0; 20]), 14);
        for point in series.values.iter().filter(|p| p.valid) {
            assert_eq!(point.value.primary(), NEUTRAL_RSI);
        }
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40).map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0).collect();
        let series = calculate_rsi(&from_closes(&closes), 14);

        for point in series.values.iter().filter(|p| p.valid) {
            let rsi = point.value.primary();
            assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
        }
    }

    #[test]
    fn rsi_matches_hand_computed_ema() {
        // changes: +2, -1 ; span 2 -> alpha 2/3
        let series = calculate_rsi(&from_closes(&[10.0, 12.0, 11.0]), 2);
        let a = 2.0 / 3.0;
        let g1 = a * 2.0;
        let l1 = 0.0;
        let g2 = (1.0 - a) * g1;
        let l2 = a * 1.0 + (1.0 - a) * l1;
        let expected = 100.0 - 100.0 / (1.0 + g2 / l2);
        assert!((series.values[2].value.primary() - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&from_closes(&[100.0, 101.0]), 0);
        assert!(series.is_empty());
    }
}
