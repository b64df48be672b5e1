//! Bar data access port trait.

use crate::domain::error::RegimeError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDateTime;

pub trait DataPort {
    /// All bars of `symbol` at `period` minutes, ascending by timestamp.
    fn fetch_bars(&self, symbol: &str, period: u32) -> Result<Vec<OhlcvBar>, RegimeError>;

    fn list_symbols(&self, period: u32) -> Result<Vec<String>, RegimeError>;

    /// First timestamp, last timestamp and bar count, or `None` without data.
    fn get_data_range(
        &self,
        symbol: &str,
        period: u32,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, RegimeError>;
}
