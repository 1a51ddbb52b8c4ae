//! Configuration validation.
//!
//! All config fields are checked up front, before any data is touched.

use crate::domain::error::SiftError;
use crate::domain::weights::WeightProfile;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SiftError> {
    match config.get_string("data", "dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(SiftError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        }),
    }
}

pub fn validate_universe_config(config: &dyn ConfigPort) -> Result<(), SiftError> {
    // The symbol list is optional: without it the data adapter serves every
    // symbol it finds.
    match config.get_string("universe", "symbols") {
        Some(s) => parse_symbols(&s).map(|_| ()),
        None => Ok(()),
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SiftError> {
    validate_dates(config)?;
    validate_holding_periods(config)?;
    validate_min_days(config)?;
    validate_step(config)?;
    Ok(())
}

/// Validates an ad-hoc `[strategy]` section when one is present.
pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SiftError> {
    if config.get_string("strategy", "name").is_none() {
        return Ok(());
    }
    strategy_weights(config)?.validate()?;

    let min_rsi = config.get_double("strategy", "min_rsi", 0.0);
    let max_rsi = config.get_double("strategy", "max_rsi", 100.0);
    if min_rsi > max_rsi {
        return Err(SiftError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "min_rsi".to_string(),
            reason: "min_rsi must not exceed max_rsi".to_string(),
        });
    }

    let min_price = config.get_double("strategy", "min_price", 0.0);
    let max_price = config.get_double("strategy", "max_price", f64::MAX);
    if min_price > max_price {
        return Err(SiftError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "min_price".to_string(),
            reason: "min_price must not exceed max_price".to_string(),
        });
    }

    let max_results = config.get_int("strategy", "max_results", 50);
    if max_results < 1 {
        return Err(SiftError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "max_results".to_string(),
            reason: "max_results must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// The five dimension weights of an ad-hoc strategy section.
pub fn strategy_weights(config: &dyn ConfigPort) -> Result<WeightProfile, SiftError> {
    Ok(WeightProfile::new(
        config.get_double("strategy", "weight_technical", 0.40),
        config.get_double("strategy", "weight_momentum", 0.25),
        config.get_double("strategy", "weight_volume", 0.20),
        config.get_double("strategy", "weight_volatility", 0.10),
        config.get_double("strategy", "weight_sentiment", 0.05),
    ))
}

/// Comma-separated symbol list: trimmed, uppercased, no empties, no
/// duplicates.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, SiftError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(SiftError::ConfigInvalid {
                section: "universe".to_string(),
                key: "symbols".to_string(),
                reason: "empty token in symbol list".to_string(),
            });
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(SiftError::ConfigInvalid {
                section: "universe".to_string(),
                key: "symbols".to_string(),
                reason: format!("duplicate symbol: {symbol}"),
            });
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

pub fn parse_holding_periods(input: &str) -> Result<Vec<usize>, SiftError> {
    let mut periods = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        let period: usize = trimmed.parse().map_err(|_| SiftError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "holding_periods".to_string(),
            reason: format!("invalid holding period: {trimmed}"),
        })?;
        if period == 0 {
            return Err(SiftError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "holding_periods".to_string(),
                reason: "holding periods must be positive".to_string(),
            });
        }
        periods.push(period);
    }
    periods.sort_unstable();
    periods.dedup();
    Ok(periods)
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SiftError> {
    let start = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "backtest",
        "start_date",
    )?;
    let end = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "backtest",
        "end_date",
    )?;
    if start >= end {
        return Err(SiftError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, section: &str, field: &str) -> Result<NaiveDate, SiftError> {
    match value {
        None => Err(SiftError::ConfigMissing {
            section: section.to_string(),
            key: field.to_string(),
        }),
        Some(s) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| SiftError::ConfigInvalid {
                section: section.to_string(),
                key: field.to_string(),
                reason: format!("invalid {field} format, expected YYYY-MM-DD"),
            })
        }
    }
}

fn validate_holding_periods(config: &dyn ConfigPort) -> Result<(), SiftError> {
    match config.get_string("backtest", "holding_periods") {
        Some(s) => parse_holding_periods(&s).map(|_| ()),
        None => Ok(()),
    }
}

fn validate_min_days(config: &dyn ConfigPort) -> Result<(), SiftError> {
    let value = config.get_int("backtest", "min_days", 20);
    if value < 1 {
        return Err(SiftError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "min_days".to_string(),
            reason: "min_days must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_step(config: &dyn ConfigPort) -> Result<(), SiftError> {
    let value = config.get_int("backtest", "step", 1);
    if value < 1 {
        return Err(SiftError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "step".to_string(),
            reason: "step must be at least 1".to_string(),
        });
    }
    Ok(())
}
