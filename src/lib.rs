//! quantdash: strategy backtesting and portfolio analytics.
//!
//! Hexagonal architecture: the pure engine lives in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
