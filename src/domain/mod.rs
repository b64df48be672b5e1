//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod cross_signal;
pub mod factor;
pub mod combine;
pub mod analysis;
pub mod config_validation;
pub mod error;
