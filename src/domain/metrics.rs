//! Risk/return statistics for an equity curve.
//!
//! Conventions, shared by the single-asset and portfolio paths:
//! - period returns are `curve[t] / curve[t-1] - 1`;
//! - annualized return is the arithmetic mean period return times
//!   `periods_per_year`;
//! - volatility is the sample (n - 1) standard deviation scaled by
//!   `sqrt(periods_per_year)`;
//! - Sharpe and Sortino are 0 when their denominator is exactly 0;
//! - maximum drawdown is `min(curve / running_peak - 1)`, in `[-1, 0]`.

use super::equity::EquityCurve;
use super::error::QuantError;

pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    pub periods_per_year: u32,
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsResult {
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of periods spent below a previous peak.
    pub max_drawdown_duration: usize,
}

pub fn evaluate(curve: &EquityCurve, config: &MetricsConfig) -> Result<MetricsResult, QuantError> {
    if config.periods_per_year == 0 {
        return Err(QuantError::invalid_parameter(
            "periods_per_year",
            "must be positive",
        ));
    }
    if !config.risk_free_rate.is_finite() {
        return Err(QuantError::invalid_parameter(
            "risk_free_rate",
            "must be finite",
        ));
    }

    let returns = curve.period_returns();
    if returns.len() < 2 {
        return Err(QuantError::insufficient("metrics", returns.len(), 2));
    }

    let ppy = f64::from(config.periods_per_year);
    let values = curve.values();

    let total_return = values[values.len() - 1] / values[0] - 1.0;
    let annualized_return = mean(&returns) * ppy;
    let annualized_volatility = sample_std(&returns) * ppy.sqrt();

    let excess = annualized_return - config.risk_free_rate;
    let sharpe_ratio = if annualized_volatility == 0.0 {
        0.0
    } else {
        excess / annualized_volatility
    };

    let downside = downside_deviation(&returns, config.risk_free_rate / ppy) * ppy.sqrt();
    let sortino_ratio = if downside == 0.0 { 0.0 } else { excess / downside };

    let (max_drawdown, max_drawdown_duration) = compute_drawdown(&values);

    Ok(MetricsResult {
        total_return,
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        max_drawdown_duration,
    })
}

/// Sample standard deviation of per-period returns scaled to a year.
/// `None` with fewer than two observations.
pub fn annualized_volatility(returns: &[f64], periods_per_year: u32) -> Option<f64> {
    (returns.len() >= 2).then(|| sample_std(returns) * f64::from(periods_per_year).sqrt())
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn sample_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() as f64 - 1.0)).sqrt()
}

fn downside_deviation(returns: &[f64], threshold: f64) -> f64 {
    let ss: f64 = returns
        .iter()
        .map(|&r| (r - threshold).min(0.0).powi(2))
        .sum();
    (ss / returns.len() as f64).sqrt()
}

fn compute_drawdown(values: &[f64]) -> (f64, usize) {
    let mut peak = values[0];
    let mut max_dd = 0.0_f64;
    let mut run = 0usize;
    let mut longest = 0usize;

    for &v in values {
        if v >= peak {
            peak = v;
            run = 0;
            continue;
        }
        // Equity at or below zero is total loss.
        let dd = (v / peak - 1.0).max(-1.0);
        max_dd = max_dd.min(dd);
        run += 1;
        longest = longest.max(run);
    }

    (max_dd, longest)
}
