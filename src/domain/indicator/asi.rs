//! ASI (Accumulation Swing Index) and its moving average ASIT.
//!
//! Per bar i > 0, with current C/O/H/L and previous C'/O'/L':
//!   A = |H - C'|, B = |L - C'|, C = |H - L'|, D = |C' - O|
//!   E = max(A, B, C)
//!   R = A - B/2 + D/4   if A is largest
//!       B - A/2 + D/4   if B is largest
//!       C + D/4         otherwise
//!   K = max(A, B)
//!   SI = 50 * ((C - C') + (C - O)/2 + (C' - O')/4) / R * K / E, 0 if R or K is 0
//! SI[0] = 0, ASI = cumulative SI, ASIT = MA(ASI, p).
//!
//! ASI is defined from bar 0; a point's `valid` flag tracks ASIT, which needs (p-1) bars.

use crate::domain::indicator::rolling::rolling_mean;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_ASIT_PERIOD: usize = 10;

pub fn swing_index(prev: &OhlcvBar, bar: &OhlcvBar) -> f64 {
    let a = (bar.high - prev.close).abs();
    let b = (bar.low - prev.close).abs();
    let c = (bar.high - prev.low).abs();
    let d = (prev.close - bar.open).abs();
    let e = a.max(b).max(c);

    let r = if a >= b && a >= c {
        a - 0.5 * b + 0.25 * d
    } else if b >= a && b >= c {
        b - 0.5 * a + 0.25 * d
    } else {
        c + 0.25 * d
    };
    let k = a.max(b);

    if r == 0.0 || k == 0.0 {
        return 0.0;
    }
    let numerator = (bar.close - prev.close)
        + 0.5 * (bar.close - bar.open)
        + 0.25 * (prev.close - prev.open);
    50.0 * numerator / r * k / e
}

pub fn calculate_asi(bars: &[OhlcvBar], asit_period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Asi { asit_period };
    if asit_period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(indicator_type);
    }

    let mut asi = Vec::with_capacity(bars.len());
    let mut cumulative = 0.0;
    asi.push(cumulative);
    for w in bars.windows(2) {
        cumulative += swing_index(&w[0], &w[1]);
        asi.push(cumulative);
    }
    let asit = rolling_mean(&asi, asit_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let asit_valid = i + 1 >= asit_period;
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid: asit_valid,
                value: IndicatorValue::Asi {
                    asi: asi[i],
                    asit: if asit_valid { asit[i] } else { 0.0 },
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::{from_closes, from_ohlc};

    fn asi_at(series: &IndicatorSeries, i: usize) -> (f64, f64) {
        match series.values[i].value {
            IndicatorValue::Asi { asi, asit } => (asi, asit),
            _ => panic!("Expected Asi value"),
        }
    }

    #[test]
    fn swing_index_c_largest() {
        let bars = from_ohlc(&[(10.0, 11.0, 9.0, 10.0), (10.5, 13.0, 10.0, 12.0)]);
        // A = 3, B = 0, C = 4, D = 0.5 -> C largest
        let a: f64 = 3.0;
        let b: f64 = 0.0;
        let c: f64 = 4.0;
        let d: f64 = 0.5;
        let r = c + 0.25 * d;
        let k = a.max(b);
        let e = c;
        let num = (12.0 - 10.0) + 0.5 * (12.0 - 10.5) + 0.25 * (10.0 - 10.0);
        let expected = 50.0 * num / r * k / e;
        assert!((swing_index(&bars[0], &bars[1]) - expected).abs() < 1e-9);
    }

    #[test]
    fn swing_index_flat_bars_is_zero() {
        let bars = from_closes(&[10.0, 10.0]);
        assert_eq!(swing_index(&bars[0], &bars[1]), 0.0);
    }

    #[test]
    fn asi_accumulates_swing_index() {
        let bars = from_ohlc(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.5, 13.0, 10.0, 12.0),
            (12.0, 12.5, 10.5, 11.0),
            (11.0, 14.0, 10.8, 13.5),
        ]);
        let series = calculate_asi(&bars, 2);

        let mut expected = 0.0;
        assert_eq!(asi_at(&series, 0).0, 0.0);
        for i in 1..bars.len() {
            expected += swing_index(&bars[i - 1], &bars[i]);
            assert!((asi_at(&series, i).0 - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn asit_is_moving_average_of_asi() {
        let bars = from_ohlc(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.5, 13.0, 10.0, 12.0),
            (12.0, 12.5, 10.5, 11.0),
        ]);
        let series = calculate_asi(&bars, 2);
        assert!(!series.values[0].valid);
        assert!(series.values[1].valid);
        let (a1, _) = asi_at(&series, 1);
        let (a2, t2) = asi_at(&series, 2);
        assert!((t2 - (a1 + a2) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn asi_zero_period() {
        assert!(calculate_asi(&from_closes(&[1.0, 2.0]), 0).is_empty());
    }
}
