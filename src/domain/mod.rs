//! Core domain types and logic.

pub mod config_validation;
pub mod cost;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod indicator_helpers;
pub mod ledger;
pub mod metrics;
pub mod ohlcv;
pub mod position;
pub mod regime;
pub mod scorer;
pub mod series;
pub mod universe;
