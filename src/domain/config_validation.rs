//! Configuration validation.
//!
//! Checks every recognised key before any data is loaded. Missing keys fall
//! back to defaults later; present keys must parse and be in range.

use crate::domain::combine::ZeroWeightPolicy;
use crate::domain::error::RegimeError;
use crate::domain::factor::FactorId;
use crate::domain::indicator::macd;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub const FACTOR_SECTION_PREFIX: &str = "factor.";

/// Section holding a factor's settings, accepting `factor.macd` for trend.
pub fn factor_section(config: &dyn ConfigPort, id: FactorId) -> Option<String> {
    let sections = config.sections();
    let primary = format!("{}{}", FACTOR_SECTION_PREFIX, id.name());
    if sections.contains(&primary) {
        return Some(primary);
    }
    if id == FactorId::Trend {
        let alias = format!("{}macd", FACTOR_SECTION_PREFIX);
        if sections.contains(&alias) {
            return Some(alias);
        }
    }
    None
}

/// Comma separated list of periods, e.g. `5, 10, 20`.
pub fn parse_period_list(value: &str) -> Result<Vec<usize>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<usize>() {
            Ok(0) => Err("periods must be positive".to_string()),
            Ok(p) => Ok(p),
            Err(_) => Err(format!("'{}' is not a period", s)),
        })
        .collect()
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), RegimeError> {
    validate_data(config)?;
    validate_combine(config)?;
    validate_factor_sections(config)?;
    for id in FactorId::ALL {
        if let Some(section) = factor_section(config, id) {
            validate_factor(config, &section, id)?;
        }
    }
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), RegimeError> {
    const SECTION: &str = "indicators";
    for key in ["ma_periods", "rsi_periods", "cci_periods"] {
        if let Some(value) = config.get_string(SECTION, key) {
            parse_period_list(&value).map_err(|reason| invalid(SECTION, key, reason))?;
        }
    }
    if let Some(value) = config.get_string(SECTION, "bias_periods") {
        let periods = parse_period_list(&value)
            .map_err(|reason| invalid(SECTION, "bias_periods", reason))?;
        if periods.len() != 3 {
            return Err(invalid(SECTION, "bias_periods", "expected three periods"));
        }
    }
    for key in [
        "boll_period",
        "kdj_n",
        "kdj_m1",
        "kdj_m2",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "asit_period",
    ] {
        positive_int(config, SECTION, key)?;
    }
    positive_double(config, SECTION, "boll_std_dev")?;
    fast_below_slow(config, SECTION, "macd_fast", "macd_slow")
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), RegimeError> {
    positive_int(config, "data", "period")?;
    for key in ["dir", "symbol"] {
        if let Some(value) = config.get_string("data", key) {
            if value.trim().is_empty() {
                return Err(invalid("data", key, "must not be empty"));
            }
        }
    }
    Ok(())
}

fn validate_combine(config: &dyn ConfigPort) -> Result<(), RegimeError> {
    if let Some(value) = config.get_string("combine", "zero_weight") {
        ZeroWeightPolicy::from_str(&value).map_err(|reason| invalid("combine", "zero_weight", reason))?;
    }
    Ok(())
}

fn validate_factor_sections(config: &dyn ConfigPort) -> Result<(), RegimeError> {
    let sections = config.sections();
    for section in &sections {
        if let Some(name) = section.strip_prefix(FACTOR_SECTION_PREFIX) {
            if FactorId::from_name(name).is_none() {
                return Err(RegimeError::ConfigInvalid {
                    section: section.clone(),
                    key: String::new(),
                    reason: format!("unknown factor '{}'", name),
                });
            }
        }
    }
    let trend = format!("{}trend", FACTOR_SECTION_PREFIX);
    let macd = format!("{}macd", FACTOR_SECTION_PREFIX);
    if sections.contains(&trend) && sections.contains(&macd) {
        return Err(RegimeError::ConfigInvalid {
            section: macd,
            key: String::new(),
            reason: "duplicates [factor.trend]".into(),
        });
    }
    Ok(())
}

fn validate_factor(config: &dyn ConfigPort, section: &str, id: FactorId) -> Result<(), RegimeError> {
    if let Some(weight) = parse_opt::<f64>(config, section, "weight")? {
        if !weight.is_finite() || weight < 0.0 {
            return Err(RegimeError::InvalidWeight {
                factor: id.name().to_string(),
                weight,
            });
        }
    }
    positive_int(config, section, "period")?;
    match id {
        FactorId::Trend => {
            for key in ["fast_period", "slow_period", "signal_period"] {
                positive_int(config, section, key)?;
            }
            fast_below_slow(config, section, "fast_period", "slow_period")?;
        }
        FactorId::Boll => positive_double(config, section, "std_dev")?,
        _ => {}
    }
    Ok(())
}

/// Compares the effective fast and slow periods, falling back to the MACD
/// defaults for whichever key is absent.
fn fast_below_slow(
    config: &dyn ConfigPort,
    section: &str,
    fast_key: &str,
    slow_key: &str,
) -> Result<(), RegimeError> {
    let fast = parse_opt::<i64>(config, section, fast_key)?;
    let slow = parse_opt::<i64>(config, section, slow_key)?;
    if fast.is_none() && slow.is_none() {
        return Ok(());
    }
    let effective_fast = fast.unwrap_or(macd::DEFAULT_FAST as i64);
    let effective_slow = slow.unwrap_or(macd::DEFAULT_SLOW as i64);
    if effective_fast >= effective_slow {
        let key = if fast.is_some() { fast_key } else { slow_key };
        return Err(invalid(
            section,
            key,
            format!(
                "{} ({}) must be less than {} ({})",
                fast_key, effective_fast, slow_key, effective_slow
            ),
        ));
    }
    Ok(())
}

fn positive_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), RegimeError> {
    match parse_opt::<i64>(config, section, key)? {
        Some(v) if v <= 0 => Err(invalid(section, key, format!("{} must be positive", key))),
        _ => Ok(()),
    }
}

fn positive_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), RegimeError> {
    match parse_opt::<f64>(config, section, key)? {
        Some(v) if !(v.is_finite() && v > 0.0) => {
            Err(invalid(section, key, format!("{} must be positive", key)))
        }
        _ => Ok(()),
    }
}

fn parse_opt<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, RegimeError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{}' is not a number", raw.trim()))),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> RegimeError {
    RegimeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
