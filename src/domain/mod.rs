//! Core domain types and the backtesting engine. Nothing here performs I/O.

pub mod price_series;
pub mod returns;
pub mod signal;
pub mod position;
pub mod equity;
pub mod metrics;
pub mod weights;
pub mod portfolio;
pub mod correlation;
pub mod backtest;
pub mod prediction;
pub mod config_validation;
pub mod universe;
pub mod error;
