//! Configuration validation.
//!
//! Every key has a default, so validation checks the effective value: either
//! what the file sets or the default it falls back to.

use crate::domain::error::LionError;
use crate::domain::universe::{parse_codes, DEFAULT_LOOKBACK_DAYS};
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), LionError> {
    validate_account(config)?;
    validate_allocation(config)?;
    validate_costs(config)?;
    validate_universe(config)?;
    validate_indices(config)?;
    validate_lookback(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> LionError {
    LionError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Reads a float and rejects NaN and infinities before any range check.
fn finite(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, LionError> {
    let value = config.get_double(section, key, default);
    if !value.is_finite() {
        return Err(invalid(section, key, &format!("{key} must be a finite number")));
    }
    Ok(value)
}

fn validate_account(config: &dyn ConfigPort) -> Result<(), LionError> {
    if finite(config, "account", "initial_capital", 100_000.0)? <= 0.0 {
        return Err(invalid("account", "initial_capital", "initial_capital must be positive"));
    }
    if finite(config, "account", "goal_profit", 300_000.0)? <= 0.0 {
        return Err(invalid("account", "goal_profit", "goal_profit must be positive"));
    }
    Ok(())
}

fn validate_allocation(config: &dyn ConfigPort) -> Result<(), LionError> {
    if finite(config, "allocation", "budget_per_symbol", 20_000.0)? <= 0.0 {
        return Err(invalid(
            "allocation",
            "budget_per_symbol",
            "budget_per_symbol must be positive",
        ));
    }
    if config.get_int("allocation", "max_daily_positions", 5) < 1 {
        return Err(invalid(
            "allocation",
            "max_daily_positions",
            "max_daily_positions must be at least 1",
        ));
    }
    for (key, default) in [("target_pct", 0.15), ("stop_loss_pct", 0.05)] {
        let value = finite(config, "allocation", key, default)?;
        if value <= 0.0 || value >= 1.0 {
            return Err(invalid(
                "allocation",
                key,
                &format!("{key} must be between 0 and 1"),
            ));
        }
    }
    Ok(())
}

fn validate_costs(config: &dyn ConfigPort) -> Result<(), LionError> {
    for (key, default) in [("fee_rate", 0.001425), ("tax_rate", 0.003)] {
        let value = finite(config, "costs", key, default)?;
        if !(0.0..1.0).contains(&value) {
            return Err(invalid("costs", key, &format!("{key} must be in [0, 1)")));
        }
    }
    let discount = finite(config, "costs", "fee_discount", 0.2)?;
    if discount <= 0.0 || discount > 1.0 {
        return Err(invalid("costs", "fee_discount", "fee_discount must be in (0, 1]"));
    }
    if config.get_int("costs", "min_fee", 1) < 0 {
        return Err(invalid("costs", "min_fee", "min_fee must be non-negative"));
    }
    Ok(())
}

fn validate_universe(config: &dyn ConfigPort) -> Result<(), LionError> {
    match config.get_string("universe", "codes") {
        None => Ok(()),
        Some(codes) => parse_codes(&codes)
            .map(|_| ())
            .map_err(|e| invalid("universe", "codes", &e.to_string())),
    }
}

fn validate_indices(config: &dyn ConfigPort) -> Result<(), LionError> {
    for key in ["domestic", "volatility", "foreign_primary"] {
        if let Some(code) = config.get_string("indices", key) {
            if code.trim().is_empty() {
                return Err(invalid("indices", key, &format!("{key} index code is empty")));
            }
        }
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), LionError> {
    let days = config.get_int("data", "lookback_days", DEFAULT_LOOKBACK_DAYS);
    // 60 trading bars need roughly 90 calendar days
    if days < 90 {
        return Err(invalid("data", "lookback_days", "lookback_days must be at least 90"));
    }
    Ok(())
}
