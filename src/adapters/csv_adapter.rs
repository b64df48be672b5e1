//! CSV file data adapter.
//!
//! One file per symbol and bar period, `{dir}/{symbol}_{period}.csv`, with a
//! header row naming `timestamp,open,high,low,close` and optionally `volume`.

use crate::domain::error::RegimeError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use tracing::debug;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, period: u32) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, period))
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, RegimeError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_ascii_lowercase().as_str()))
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| RegimeError::DataRead {
                reason: format!("missing {} column", names[0]),
            })
        };
        Ok(Self {
            timestamp: require(&["timestamp", "datetime", "date", "time"])?,
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close"])?,
            volume: find(&["volume", "vol"]),
        })
    }
}

fn field<'r>(record: &'r csv::StringRecord, index: usize, name: &str, line: u64) -> Result<&'r str, RegimeError> {
    record.get(index).ok_or_else(|| RegimeError::DataRead {
        reason: format!("line {}: missing {} value", line, name),
    })
}

fn number(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<f64, RegimeError> {
    let raw = field(record, index, name, line)?;
    let value: f64 = raw.trim().parse().map_err(|_| RegimeError::DataRead {
        reason: format!("line {}: invalid {} value '{}'", line, name, raw),
    })?;
    if !value.is_finite() {
        return Err(RegimeError::DataRead {
            reason: format!("line {}: non-finite {} value '{}'", line, name, raw),
        });
    }
    Ok(value)
}

/// Parses bars from any CSV source and sorts them by timestamp.
pub fn read_bars<R: Read>(reader: R, symbol: &str, period: u32) -> Result<Vec<OhlcvBar>, RegimeError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers().map_err(|e| RegimeError::DataRead {
        reason: format!("CSV header error: {}", e),
    })?;
    let cols = Columns::from_headers(headers)?;

    let mut bars = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| RegimeError::DataRead {
            reason: format!("CSV parse error: {}", e),
        })?;
        let line = record.position().map_or(0, |p| p.line());

        let raw_ts = field(&record, cols.timestamp, "timestamp", line)?;
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| RegimeError::DataRead {
            reason: format!("line {}: invalid timestamp '{}'", line, raw_ts),
        })?;

        let volume = match cols.volume {
            Some(i) if record.get(i).is_some_and(|v| !v.trim().is_empty()) => {
                Some(number(&record, i, "volume", line)?)
            }
            _ => None,
        };

        bars.push(OhlcvBar {
            symbol: symbol.to_string(),
            period,
            open: number(&record, cols.open, "open", line)?,
            high: number(&record, cols.high, "high", line)?,
            low: number(&record, cols.low, "low", line)?,
            close: number(&record, cols.close, "close", line)?,
            volume,
            timestamp,
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str, period: u32) -> Result<Vec<OhlcvBar>, RegimeError> {
        let path = self.csv_path(symbol, period);
        let file = fs::File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RegimeError::NoData {
                symbol: symbol.to_string(),
            },
            _ => RegimeError::DataRead {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;
        let bars = read_bars(file, symbol, period)?;
        debug!(path = %path.display(), bars = bars.len(), "bars loaded");
        Ok(bars)
    }

    fn list_symbols(&self, period: u32) -> Result<Vec<String>, RegimeError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| RegimeError::DataRead {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", period);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| RegimeError::DataRead {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        period: u32,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, RegimeError> {
        let bars = match self.fetch_bars(symbol, period) {
            Ok(bars) => bars,
            Err(RegimeError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }
}
