//! Configuration validation.
//!
//! Checks every key a run will read before any data is loaded, so a bad
//! config fails with the section and key at fault.

use crate::domain::error::QuantError;
use crate::domain::portfolio::Rebalance;
use crate::domain::returns::ReturnKind;
use crate::domain::signal::SignalMode;
use crate::domain::universe::parse_codes;
use crate::domain::weights::WeightScheme;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    validate_strategy(config)?;
    validate_metrics(config)?;
    validate_forecast(config)?;
    Ok(())
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    validate_metrics(config)?;
    parse_key::<WeightScheme>(config, "portfolio", "weights")?;
    parse_key::<Rebalance>(config, "portfolio", "rebalance")?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    validate_data_source(config)?;
    validate_codes(config)?;
    Ok(())
}

/// The `[data]` keys other than the code list.
pub fn validate_data_source(config: &dyn ConfigPort) -> Result<(), QuantError> {
    require_non_empty(config, "data", "directory")?;
    validate_dates(config)?;
    Ok(())
}

/// Parses `[section] key` if present. Missing keys are `Ok(None)`.
pub fn parse_key<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<T>, QuantError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(section, key, e.to_string())),
    }
}

pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, QuantError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD")))
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> QuantError {
    QuantError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> QuantError {
    QuantError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn require_non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, QuantError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(missing(section, key)),
    }
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), QuantError> {
    let strategy = require_non_empty(config, "backtest", "strategy")?;
    match strategy.trim().to_lowercase().as_str() {
        "buy_hold" => Ok(()),
        "momentum" => {
            let lookback = parse_key::<i64>(config, "backtest", "lookback")?
                .ok_or_else(|| missing("backtest", "lookback"))?;
            if lookback < 1 {
                return Err(invalid("backtest", "lookback", "lookback must be at least 1"));
            }
            parse_key::<SignalMode>(config, "backtest", "signal")?;
            Ok(())
        }
        other => Err(invalid(
            "backtest",
            "strategy",
            format!("unknown strategy {other:?}, expected buy_hold or momentum"),
        )),
    }
}

fn validate_metrics(config: &dyn ConfigPort) -> Result<(), QuantError> {
    if let Some(ppy) = parse_key::<i64>(config, "backtest", "periods_per_year")? {
        if ppy < 1 || ppy > i64::from(u32::MAX) {
            return Err(invalid(
                "backtest",
                "periods_per_year",
                "periods_per_year must be a positive integer",
            ));
        }
    }
    if let Some(rf) = parse_key::<f64>(config, "backtest", "risk_free_rate")? {
        if !rf.is_finite() {
            return Err(invalid("backtest", "risk_free_rate", "risk_free_rate must be finite"));
        }
    }
    parse_key::<ReturnKind>(config, "backtest", "returns")?;
    Ok(())
}

fn validate_forecast(config: &dyn ConfigPort) -> Result<(), QuantError> {
    for (key, minimum) in [("forecast_horizon", 1), ("forecast_lookback", 2)] {
        if let Some(v) = parse_key::<i64>(config, "backtest", key)? {
            if v < minimum {
                return Err(invalid(
                    "backtest",
                    key,
                    format!("{key} must be at least {minimum}"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), QuantError> {
    let codes = config.get_string("data", "codes");
    let code = config.get_string("data", "code");

    match (codes, code) {
        (Some(c), _) if !c.trim().is_empty() => parse_codes(&c)
            .map(|_| ())
            .map_err(|e| invalid("data", "codes", e.to_string())),
        (_, Some(c)) if !c.trim().is_empty() => Ok(()),
        _ => Err(missing("data", "code")),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), QuantError> {
    let start = config
        .get_string("data", "start_date")
        .map(|s| parse_date(&s, "data", "start_date"))
        .transpose()?;
    let end = config
        .get_string("data", "end_date")
        .map(|s| parse_date(&s, "data", "end_date"))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid("data", "start_date", "start_date must be before end_date"));
        }
    }
    Ok(())
}
