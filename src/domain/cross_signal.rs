//! DIF/DEA crossing state machine.
//!
//! A golden cross (DIF rises through DEA) starts a bullish run, a death cross
//! (DIF falls through DEA) starts a bearish one. Each following bar on the
//! same side extends the run by one. Any other bar holds the previous state
//! unchanged; the run is never reset to `NoSignal`.
//!
//! Downstream code receives the state encoded as one number:
//! `0` for no signal, `100000 + n` for the n-th bar of a bullish run and
//! `200000 + n` for a bearish one.

use crate::domain::indicator::macd::split_lines;
use crate::domain::indicator::IndicatorSeries;
use chrono::NaiveDateTime;

pub const GOLDEN_BASE: u32 = 100_000;
pub const DEATH_BASE: u32 = 200_000;
/// Longest run the numeric encoding can carry; longer runs saturate.
pub const MAX_ENCODED_RUN: u32 = GOLDEN_BASE - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossState {
    #[default]
    NoSignal,
    /// Bars since the golden cross.
    Golden(u32),
    /// Bars since the death cross.
    Death(u32),
}

impl CrossState {
    pub fn encode(self) -> u32 {
        match self {
            CrossState::NoSignal => 0,
            CrossState::Golden(n) => GOLDEN_BASE + n.min(MAX_ENCODED_RUN),
            CrossState::Death(n) => DEATH_BASE + n.min(MAX_ENCODED_RUN),
        }
    }

    pub fn decode(signal: u32) -> Self {
        if signal >= DEATH_BASE {
            CrossState::Death(signal - DEATH_BASE)
        } else if signal >= GOLDEN_BASE {
            CrossState::Golden(signal - GOLDEN_BASE)
        } else {
            CrossState::NoSignal
        }
    }

    pub fn direction(self) -> TrendDirection {
        match self {
            CrossState::NoSignal => TrendDirection::Neutral,
            CrossState::Golden(_) => TrendDirection::Bullish,
            CrossState::Death(_) => TrendDirection::Bearish,
        }
    }

    /// Bars since the last cross; 0 when there has been none.
    pub fn duration(self) -> u32 {
        match self {
            CrossState::NoSignal => 0,
            CrossState::Golden(n) | CrossState::Death(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl TrendDirection {
    /// Direction and run length of an encoded signal.
    pub fn from_signal(signal: u32) -> (Self, u32) {
        let state = CrossState::decode(signal);
        (state.direction(), state.duration())
    }

    pub fn sign(self) -> f64 {
        match self {
            TrendDirection::Bullish => 1.0,
            TrendDirection::Bearish => -1.0,
            TrendDirection::Neutral => 0.0,
        }
    }
}

/// Advances the machine by one bar given (dif, dea) at the previous and the
/// current bar.
pub fn transition(state: CrossState, prev: (f64, f64), curr: (f64, f64)) -> CrossState {
    let (prev_dif, prev_dea) = prev;
    let (dif, dea) = curr;

    if prev_dif <= prev_dea && dif > dea {
        CrossState::Golden(0)
    } else if prev_dif >= prev_dea && dif < dea {
        CrossState::Death(0)
    } else {
        match state {
            CrossState::Golden(n) if dif > dea => CrossState::Golden(n + 1),
            CrossState::Death(n) if dif < dea => CrossState::Death(n + 1),
            held => held,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSignalPoint {
    pub timestamp: NaiveDateTime,
    pub state: CrossState,
}

impl CrossSignalPoint {
    pub fn signal(&self) -> u32 {
        self.state.encode()
    }
}

/// Runs the machine over parallel DIF/DEA lines. The first point is always
/// `NoSignal`.
pub fn run_states(dif: &[f64], dea: &[f64]) -> Vec<CrossState> {
    let n = dif.len().min(dea.len());
    let mut states = Vec::with_capacity(n);
    let mut state = CrossState::NoSignal;
    for i in 0..n {
        if i > 0 {
            state = transition(state, (dif[i - 1], dea[i - 1]), (dif[i], dea[i]));
        }
        states.push(state);
    }
    states
}

/// Cross signal for every point of a trend-pair series.
pub fn signal_line(trend_pair: &IndicatorSeries) -> Vec<CrossSignalPoint> {
    let (dif, dea, _) = split_lines(trend_pair);
    run_states(&dif, &dea)
        .into_iter()
        .zip(&trend_pair.values)
        .map(|(state, point)| CrossSignalPoint {
            timestamp: point.timestamp,
            state,
        })
        .collect()
}
