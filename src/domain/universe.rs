//! Asset universes for portfolio runs.
//!
//! Parses code lists from configuration and loads a price series for each
//! code through a [`PriceDataPort`], skipping codes whose data cannot be used.

use crate::domain::error::QuantError;
use crate::domain::price_series::PriceSeries;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

impl From<UniverseError> for QuantError {
    fn from(err: UniverseError) -> Self {
        QuantError::invalid_parameter("codes", err.to_string())
    }
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Universe {
    pub prices: BTreeMap<String, PriceSeries>,
    pub skipped: Vec<SkippedCode>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.prices.len()
    }
}

/// Fetches every code, keeping the ones that load. Fails when fewer than
/// `minimum` assets remain.
/// Fewest loaded assets a portfolio run accepts.
pub const MIN_PORTFOLIO_ASSETS: usize = 2;

pub fn load_universe(
    data_port: &dyn PriceDataPort,
    codes: &[String],
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    minimum: usize,
) -> Result<Universe, QuantError> {
    let mut prices = BTreeMap::new();
    let mut skipped = Vec::new();

    for code in codes {
        match data_port.fetch_prices(code, start_date, end_date) {
            Ok(series) => {
                tracing::info!(code = %code, points = series.len(), "loaded prices");
                prices.insert(code.clone(), series);
            }
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "skipping code");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if prices.len() < minimum {
        return Err(QuantError::insufficient("universe", prices.len(), minimum));
    }

    if !skipped.is_empty() {
        tracing::warn!(
            loaded = prices.len(),
            requested = codes.len(),
            "universe is missing codes"
        );
    }

    Ok(Universe { prices, skipped })
}
