//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for regimescore.
#[derive(Debug, thiserror::Error)]
pub enum RegimeError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid weight {weight} for factor {factor}: must be finite and non-negative")]
    InvalidWeight { factor: String, weight: f64 },

    #[error("total factor weight is zero at {timestamp}")]
    ZeroWeight { timestamp: NaiveDateTime },

    #[error("bar series is not time ordered at index {index}")]
    UnorderedSeries { index: usize },

    #[error("data read error: {reason}")]
    DataRead { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("report write error: {reason}")]
    ReportWrite { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RegimeError> for std::process::ExitCode {
    fn from(err: &RegimeError) -> Self {
        let code: u8 = match err {
            RegimeError::Io(_) | RegimeError::ReportWrite { .. } => 1,
            RegimeError::ConfigParse { .. }
            | RegimeError::ConfigMissing { .. }
            | RegimeError::ConfigInvalid { .. } => 2,
            RegimeError::InvalidWeight { .. } | RegimeError::ZeroWeight { .. } => 3,
            RegimeError::UnorderedSeries { .. } | RegimeError::DataRead { .. } => 4,
            RegimeError::NoData { .. } | RegimeError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
