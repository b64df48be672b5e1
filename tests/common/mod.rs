#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use regimescore::domain::error::RegimeError;
pub use regimescore::domain::ohlcv::OhlcvBar;
use regimescore::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fmt::Write as _;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str, _period: u32) -> Result<Vec<OhlcvBar>, RegimeError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RegimeError::DataRead {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self, _period: u32) -> Result<Vec<String>, RegimeError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        _period: u32,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, RegimeError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RegimeError::DataRead {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.timestamp).min().unwrap();
                let max = bars.iter().map(|b| b.timestamp).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn minute(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 12, 25)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
        + chrono::Duration::minutes(i as i64)
}

/// One-minute bars whose open, high and low all equal the close.
pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            symbol: symbol.to_string(),
            period: 1,
            open: close,
            high: close,
            low: close,
            close,
            volume: Some(1000.0),
            timestamp: minute(i),
        })
        .collect()
}

/// 100, 101, ... one bar per minute.
pub fn uptrend(symbol: &str, count: usize) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
    bars_from_closes(symbol, &closes)
}

pub fn constant(symbol: &str, count: usize, price: f64) -> Vec<OhlcvBar> {
    bars_from_closes(symbol, &vec![price; count])
}

/// Slow sine around a drift, with a high/low range around the close.
pub fn wave(symbol: &str, count: usize) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let close = 100.0 + (i as f64 / 7.0).sin() * 5.0 + i as f64 * 0.03;
            OhlcvBar {
                symbol: symbol.to_string(),
                period: 1,
                open: close - 0.2,
                high: close + 0.6,
                low: close - 0.7,
                close,
                volume: Some(1000.0 + i as f64),
                timestamp: minute(i),
            }
        })
        .collect()
}

/// Bars rendered as a data file the CSV adapter reads.
pub fn bars_to_csv(bars: &[OhlcvBar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume.unwrap_or_default()
        );
    }
    out
}
