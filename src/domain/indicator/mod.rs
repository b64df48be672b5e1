//! Technical indicator implementations.
//!
//! Every indicator is a pure batch transform of a bar series:
//! - `IndicatorPoint`: one timestamped point, flagged `valid` once warm-up is over
//! - `IndicatorValue`: enum for the different indicator output shapes
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: a series aligned 1:1 with the input bars
//!
//! Warm-up points are kept (so every series has the input's length and
//! timestamps) but carry `valid = false` and a 0.0 sentinel.

pub mod asi;
pub mod bias;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod kdj;
pub mod ma;
pub mod macd;
pub mod rolling;
pub mod rsi;

pub use asi::calculate_asi;
pub use bias::{calculate_bias, calculate_bias_set};
pub use bollinger::calculate_bollinger;
pub use cci::calculate_cci;
pub use ema::calculate_ema;
pub use kdj::calculate_kdj;
pub use ma::calculate_ma;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd { dif: f64, dea: f64, histogram: f64 },
    Bollinger { upper: f64, middle: f64, lower: f64 },
    Kdj { k: f64, d: f64, j: f64 },
    Asi { asi: f64, asit: f64 },
}

impl IndicatorValue {
    /// The headline scalar of the value: the line itself for simple
    /// indicators, DIF, the middle band, K and ASI for the compound ones.
    pub fn primary(&self) -> f64 {
        match *self {
            IndicatorValue::Simple(v) => v,
            IndicatorValue::Macd { dif, .. } => dif,
            IndicatorValue::Bollinger { middle, .. } => middle,
            IndicatorValue::Kdj { k, .. } => k,
            IndicatorValue::Asi { asi, .. } => asi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ma(usize),
    Ema(usize),
    Rsi(usize),
    Cci(usize),
    Bias(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    Kdj {
        n: usize,
        m1: usize,
        m2: usize,
    },
    Asi {
        asit_period: usize,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub(crate) fn empty(indicator_type: IndicatorType) -> Self {
        Self {
            indicator_type,
            values: Vec::new(),
        }
    }

    /// Builds a single-line series from raw values; points before `warmup`
    /// are invalid and zeroed.
    pub(crate) fn from_simple(
        indicator_type: IndicatorType,
        bars: &[OhlcvBar],
        raw: &[f64],
        warmup: usize,
    ) -> Self {
        let values = bars
            .iter()
            .zip(raw)
            .enumerate()
            .map(|(i, (bar, &v))| {
                let valid = i >= warmup;
                IndicatorPoint {
                    timestamp: bar.timestamp,
                    valid,
                    value: IndicatorValue::Simple(if valid { v } else { 0.0 }),
                }
            })
            .collect();
        Self {
            indicator_type,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Primary scalar of every point, sentinel included.
    pub fn primary_values(&self) -> Vec<f64> {
        self.values.iter().map(|p| p.value.primary()).collect()
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.valid).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ma(period) => write!(f, "MA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::Bias(period) => write!(f, "BIAS({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLL({},{})", period, mult)
            }
            IndicatorType::Kdj { n, m1, m2 } => write!(f, "KDJ({},{},{})", n, m1, m2),
            IndicatorType::Asi { asit_period } => write!(f, "ASI({})", asit_period),
        }
    }
}

/// Computes one indicator by type.
pub fn compute_indicator(bars: &[OhlcvBar], indicator_type: &IndicatorType) -> IndicatorSeries {
    match *indicator_type {
        IndicatorType::Ma(period) => calculate_ma(bars, period),
        IndicatorType::Ema(period) => calculate_ema(bars, period),
        IndicatorType::Rsi(period) => calculate_rsi(bars, period),
        IndicatorType::Cci(period) => calculate_cci(bars, period),
        IndicatorType::Bias(period) => calculate_bias(bars, period),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => calculate_bollinger(bars, period, stddev_mult_x100 as f64 / 100.0),
        IndicatorType::Kdj { n, m1, m2 } => calculate_kdj(bars, n, m1, m2),
        IndicatorType::Asi { asit_period } => calculate_asi(bars, asit_period),
    }
}

pub fn compute_indicators(
    bars: &[OhlcvBar],
    indicator_types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    indicator_types
        .iter()
        .map(|t| (t.clone(), compute_indicator(bars, t)))
        .collect()
}

/// The indicator lines the reporting side shows by default.
pub fn standard_set() -> Vec<IndicatorType> {
    let mut set: Vec<IndicatorType> = [5, 10, 20, 30, 60].map(IndicatorType::Ma).to_vec();
    set.extend([12, 16, 24].map(IndicatorType::Rsi));
    set.extend([14, 20, 88].map(IndicatorType::Cci));
    set.extend([6, 12, 24].map(IndicatorType::Bias));
    set.push(IndicatorType::Bollinger {
        period: 20,
        stddev_mult_x100: 200,
    });
    set.push(IndicatorType::Kdj { n: 9, m1: 3, m2: 3 });
    set.push(IndicatorType::Macd {
        fast: macd::DEFAULT_FAST,
        slow: macd::DEFAULT_SLOW,
        signal: macd::DEFAULT_SIGNAL,
    });
    set.push(IndicatorType::Asi {
        asit_period: asi::DEFAULT_ASIT_PERIOD,
    });
    set
}
