//! OHLC bar representation and series ordering.

use crate::domain::error::RegimeError;
use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone)]
pub struct OhlcvBar {
    pub symbol: String,
    pub period: u32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub timestamp: NaiveDateTime,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::from_period(self.period)
    }
}

/// Returns the index of the first bar whose timestamp is earlier than its
/// predecessor's.
pub fn ensure_time_ordered(bars: &[OhlcvBar]) -> Result<(), RegimeError> {
    match bars
        .windows(2)
        .position(|w| w[1].timestamp < w[0].timestamp)
    {
        Some(i) => Err(RegimeError::UnorderedSeries { index: i + 1 }),
        None => Ok(()),
    }
}

/// Bucket size of a bar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeInterval {
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
}

impl TimeInterval {
    /// Minute period to interval. Unknown periods fall back to one minute.
    pub fn from_period(period: u32) -> Self {
        match period {
            5 => TimeInterval::Min5,
            15 => TimeInterval::Min15,
            30 => TimeInterval::Min30,
            60 => TimeInterval::Min60,
            _ => TimeInterval::Min1,
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            TimeInterval::Min1 => 1,
            TimeInterval::Min5 => 5,
            TimeInterval::Min15 => 15,
            TimeInterval::Min30 => 30,
            TimeInterval::Min60 => 60,
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}min", self.minutes())
    }
}
