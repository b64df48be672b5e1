//! Factor scoring layer.
//!
//! A factor maps one indicator (or a raw close transform) onto an opinion,
//! positive for bullish and negative for bearish, nominally in [-1, 1].
//! Momentum is the exception and is left unclamped; the combination step
//! z-scores every factor before weighting, so scale differences wash out.
//!
//! Factors only emit points where their underlying indicator is valid.

use crate::domain::cross_signal::{signal_line, CrossState, TrendDirection};
use crate::domain::error::RegimeError;
use crate::domain::indicator::macd::split_lines;
use crate::domain::indicator::rolling::{mean, sample_std};
use crate::domain::indicator::{
    calculate_bollinger, calculate_cci, calculate_macd, calculate_rsi, IndicatorSeries,
    IndicatorValue, bollinger, macd,
};
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Below this a standard deviation counts as zero.
pub const DEGENERATE_STD: f64 = 1e-8;

pub const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FactorId {
    Trend,
    Momentum,
    Rsi,
    Cci,
    Boll,
    Volatility,
}

impl FactorId {
    pub const ALL: [FactorId; 6] = [
        FactorId::Trend,
        FactorId::Momentum,
        FactorId::Rsi,
        FactorId::Cci,
        FactorId::Boll,
        FactorId::Volatility,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FactorId::Trend => "trend",
            FactorId::Momentum => "momentum",
            FactorId::Rsi => "rsi",
            FactorId::Cci => "cci",
            FactorId::Boll => "boll",
            FactorId::Volatility => "volatility",
        }
    }

    /// Parses a factor name; `macd` is accepted for the trend factor.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trend" | "macd" => Some(FactorId::Trend),
            "momentum" => Some(FactorId::Momentum),
            "rsi" => Some(FactorId::Rsi),
            "cci" => Some(FactorId::Cci),
            "boll" => Some(FactorId::Boll),
            "volatility" => Some(FactorId::Volatility),
            _ => None,
        }
    }
}

impl fmt::Display for FactorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendParams {
    /// Bars over which a cross is considered fully established.
    pub period: usize,
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            period: 20,
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorKind {
    Trend(TrendParams),
    Momentum { period: usize },
    Rsi { period: usize },
    Cci { period: usize },
    Boll { period: usize, std_dev: f64 },
    Volatility { period: usize },
}

impl FactorKind {
    /// Stock parameters of a factor.
    pub fn default_for(id: FactorId) -> Self {
        match id {
            FactorId::Trend => FactorKind::Trend(TrendParams::default()),
            FactorId::Momentum => FactorKind::Momentum { period: 20 },
            FactorId::Rsi => FactorKind::Rsi { period: 14 },
            FactorId::Cci => FactorKind::Cci { period: 14 },
            FactorId::Boll => FactorKind::Boll {
                period: bollinger::DEFAULT_PERIOD,
                std_dev: bollinger::DEFAULT_STD_DEV,
            },
            FactorId::Volatility => FactorKind::Volatility { period: 20 },
        }
    }

    pub fn id(&self) -> FactorId {
        match self {
            FactorKind::Trend(_) => FactorId::Trend,
            FactorKind::Momentum { .. } => FactorId::Momentum,
            FactorKind::Rsi { .. } => FactorId::Rsi,
            FactorKind::Cci { .. } => FactorId::Cci,
            FactorKind::Boll { .. } => FactorId::Boll,
            FactorKind::Volatility { .. } => FactorId::Volatility,
        }
    }

    pub fn period(&self) -> usize {
        match *self {
            FactorKind::Trend(p) => p.period,
            FactorKind::Momentum { period }
            | FactorKind::Rsi { period }
            | FactorKind::Cci { period }
            | FactorKind::Boll { period, .. }
            | FactorKind::Volatility { period } => period,
        }
    }

    /// Bars needed before the factor emits its first point.
    pub fn minimum_bars(&self) -> usize {
        match *self {
            FactorKind::Trend(_) => 1,
            FactorKind::Momentum { period }
            | FactorKind::Rsi { period }
            | FactorKind::Volatility { period } => period + 1,
            FactorKind::Cci { period } | FactorKind::Boll { period, .. } => period,
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorKind::Trend(p) => write!(
                f,
                "trend({},{},{};{})",
                p.fast, p.slow, p.signal, p.period
            ),
            FactorKind::Boll { period, std_dev } => write!(f, "boll({},{})", period, std_dev),
            other => write!(f, "{}({})", other.id(), other.period()),
        }
    }
}

/// Factor weights. Unregistered factors weigh [`DEFAULT_WEIGHT`].
#[derive(Debug, Clone, Default)]
pub struct FactorRegistry {
    weights: BTreeMap<FactorId, f64>,
}

impl FactorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: FactorId, weight: f64) -> Result<(), RegimeError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(RegimeError::InvalidWeight {
                factor: id.name().to_string(),
                weight,
            });
        }
        self.weights.insert(id, weight);
        Ok(())
    }

    pub fn weight(&self, id: FactorId) -> f64 {
        self.weights.get(&id).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn is_registered(&self, id: FactorId) -> bool {
        self.weights.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactorId, f64)> + '_ {
        self.weights.iter().map(|(&id, &w)| (id, w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorResult {
    pub factor_name: String,
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub weight: f64,
}

// --- Scoring functions -----------------------------------------------------

/// Trend score from the cross state and the histogram at that bar.
pub fn score_trend(state: CrossState, histogram: f64, period: usize) -> f64 {
    let direction = state.direction();
    if direction == TrendDirection::Neutral {
        return 0.0;
    }
    let duration = state.duration() as f64;
    let time_factor = if period == 0 {
        1.0
    } else {
        (duration / period as f64).min(1.0)
    };
    let time_decay = 1.0 / (1.0 + 0.1 * duration);
    let strength = (histogram.abs() / 10.0).min(1.0);
    direction.sign() * (0.5 * time_factor * time_decay + 0.5 * strength)
}

/// Percent change over `period` bars at index `i`; 0 when the base close is 0.
pub fn momentum_at(closes: &[f64], i: usize, period: usize) -> f64 {
    let base = closes[i - period];
    if base == 0.0 {
        0.0
    } else {
        (closes[i] - base) / base * 100.0
    }
}

pub fn score_rsi(rsi: f64) -> f64 {
    if !(0.0..=100.0).contains(&rsi) {
        warn!(rsi, "RSI outside [0, 100]");
    }
    if rsi >= 70.0 {
        -((rsi - 70.0) / 30.0).min(1.0)
    } else if rsi <= 30.0 {
        ((30.0 - rsi) / 30.0).min(1.0)
    } else {
        (50.0 - rsi) / 20.0
    }
}

pub fn score_cci(cci: f64) -> f64 {
    if cci > 100.0 {
        -((cci - 100.0) / 200.0).min(1.0)
    } else if cci < -100.0 {
        ((cci.abs() - 100.0) / 200.0).min(1.0)
    } else {
        -cci / 200.0
    }
}

/// Position of `close` within the band: 0 at the lower band, 1 at the upper.
/// `None` for a collapsed band or a band touching zero.
pub fn percent_b(close: f64, upper: f64, lower: f64) -> Option<f64> {
    let flat = (upper - lower).abs() <= f64::EPSILON * upper.abs().max(1.0);
    if flat || upper == 0.0 || lower == 0.0 {
        return None;
    }
    Some((close - lower) / (upper - lower))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollZone {
    AboveUpper,
    NearUpper,
    Middle,
    NearLower,
    BelowLower,
}

impl BollZone {
    pub fn from_percent_b(pb: f64) -> Self {
        if pb > 1.0 {
            BollZone::AboveUpper
        } else if pb > 0.8 {
            BollZone::NearUpper
        } else if pb < 0.0 {
            BollZone::BelowLower
        } else if pb < 0.2 {
            BollZone::NearLower
        } else {
            BollZone::Middle
        }
    }
}

pub fn score_boll(close: f64, upper: f64, mid: f64, lower: f64) -> f64 {
    let Some(pb) = percent_b(close, upper, lower) else {
        return 0.0;
    };
    let base = match BollZone::from_percent_b(pb) {
        BollZone::AboveUpper => -((pb - 1.0) * 2.0 + 0.8).min(1.0),
        BollZone::NearUpper => -0.5 - (pb - 0.8) * 1.5,
        BollZone::BelowLower => (pb.abs() * 2.0 + 0.8).min(1.0),
        BollZone::NearLower => 0.5 + (0.2 - pb) * 1.5,
        BollZone::Middle => 0.5 - pb,
    };
    let bandwidth = if mid > 0.0 { (upper - lower) / mid } else { 0.0 };
    base * (bandwidth / 0.1).min(1.5)
}

/// Rolling sample std of close-to-close returns, in percent. Entry `i` is
/// defined for `i >= period` and covers returns `i+1-period ..= i`.
pub fn rolling_volatility(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut returns = vec![0.0; closes.len()];
    for i in 1..closes.len() {
        let prev = closes[i - 1];
        returns[i] = if prev == 0.0 { 0.0 } else { closes[i] / prev - 1.0 };
    }
    (0..closes.len())
        .map(|i| {
            (period > 0 && i >= period)
                .then(|| sample_std(&returns[i + 1 - period..=i]) * 100.0)
        })
        .collect()
}

// --- Factor computation ----------------------------------------------------

/// Computes one factor over a bar series.
pub fn compute_factor(
    bars: &[OhlcvBar],
    kind: &FactorKind,
    registry: &FactorRegistry,
) -> Vec<FactorResult> {
    let id = kind.id();
    let weight = registry.weight(id);

    let scored: Vec<(NaiveDateTime, f64)> = if kind.period() == 0 {
        warn!(factor = %id, "zero period, factor skipped");
        Vec::new()
    } else {
        match *kind {
            FactorKind::Trend(params) => trend_scores(bars, params),
            FactorKind::Momentum { period } => momentum_scores(bars, period),
            FactorKind::Rsi { period } => {
                scalar_scores(&calculate_rsi(bars, period), score_rsi)
            }
            FactorKind::Cci { period } => {
                scalar_scores(&calculate_cci(bars, period), score_cci)
            }
            FactorKind::Boll { period, std_dev } => boll_scores(bars, period, std_dev),
            FactorKind::Volatility { period } => volatility_scores(bars, period),
        }
    };

    if scored.is_empty() && !bars.is_empty() {
        warn!(
            factor = %kind,
            bars = bars.len(),
            minimum = kind.minimum_bars(),
            "factor produced no points"
        );
    }
    debug!(factor = %kind, points = scored.len(), weight, "factor computed");

    scored
        .into_iter()
        .map(|(timestamp, value)| FactorResult {
            factor_name: id.name().to_string(),
            timestamp,
            value,
            weight,
        })
        .collect()
}

fn trend_scores(bars: &[OhlcvBar], params: TrendParams) -> Vec<(NaiveDateTime, f64)> {
    let pair = calculate_macd(bars, params.fast, params.slow, params.signal);
    let (_, _, histogram) = split_lines(&pair);
    signal_line(&pair)
        .into_iter()
        .zip(histogram)
        .map(|(point, hist)| {
            (
                point.timestamp,
                score_trend(point.state, hist, params.period),
            )
        })
        .collect()
}

fn momentum_scores(bars: &[OhlcvBar], period: usize) -> Vec<(NaiveDateTime, f64)> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    (period..bars.len())
        .map(|i| (bars[i].timestamp, momentum_at(&closes, i, period)))
        .collect()
}

fn scalar_scores(series: &IndicatorSeries, score: fn(f64) -> f64) -> Vec<(NaiveDateTime, f64)> {
    series
        .values
        .iter()
        .filter(|p| p.valid)
        .map(|p| (p.timestamp, score(p.value.primary())))
        .collect()
}

fn boll_scores(bars: &[OhlcvBar], period: usize, std_dev: f64) -> Vec<(NaiveDateTime, f64)> {
    let bands = calculate_bollinger(bars, period, std_dev);
    bands
        .values
        .iter()
        .zip(bars)
        .filter(|(p, _)| p.valid)
        .filter_map(|(p, bar)| match p.value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => Some((p.timestamp, score_boll(bar.close, upper, middle, lower))),
            _ => None,
        })
        .collect()
}

fn volatility_scores(bars: &[OhlcvBar], period: usize) -> Vec<(NaiveDateTime, f64)> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let vol: Vec<(NaiveDateTime, f64)> = rolling_volatility(&closes, period)
        .into_iter()
        .zip(bars)
        .filter_map(|(v, bar)| v.map(|v| (bar.timestamp, v)))
        .collect();

    let values: Vec<f64> = vol.iter().map(|&(_, v)| v).collect();
    let m = mean(&values);
    let s = sample_std(&values);
    if s <= DEGENERATE_STD {
        if !values.is_empty() {
            warn!(period, "volatility series is flat, scoring neutral");
        }
        return vol.into_iter().map(|(t, _)| (t, 0.0)).collect();
    }
    vol.into_iter()
        .map(|(t, v)| (t, (-(v - m) / s).clamp(-1.0, 1.0)))
        .collect()
}
