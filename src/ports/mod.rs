//! Port traits the domain talks to the outside world through.

pub mod config_port;
pub mod data_port;
pub mod ledger_port;
