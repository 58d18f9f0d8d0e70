//! Backtest orchestration: the entry points external callers use.
//!
//! Single asset: signal -> lagged position -> returns -> equity -> metrics.
//! Portfolio: aligned returns -> weights -> aggregate -> equity -> metrics,
//! plus correlation and per-asset metrics over the same dates.

use rayon::prelude::*;
use std::collections::BTreeMap;

use super::correlation::{correlate_aligned, CorrelationMatrix};
use super::equity::{self, EquityCurve};
use super::error::QuantError;
use super::metrics::{evaluate, MetricsConfig, MetricsResult};
use super::portfolio::{aggregate_aligned, Rebalance};
use super::position::{lag, PositionSeries};
use super::price_series::PriceSeries;
use super::returns::{align, ReturnKind, ReturnSeries};
use super::signal::{generate, SignalSeries, StrategyKind};
use super::weights::{WeightScheme, WeightVector};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub strategy: StrategyKind,
    pub return_kind: ReturnKind,
    pub metrics: MetricsConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::BuyAndHold,
            return_kind: ReturnKind::Simple,
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub code: String,
    pub strategy: StrategyKind,
    pub signals: SignalSeries,
    pub positions: PositionSeries,
    pub equity: EquityCurve,
    pub metrics: MetricsResult,
}

pub fn run(prices: &PriceSeries, config: &BacktestConfig) -> Result<BacktestResult, QuantError> {
    let signals = generate(prices, &config.strategy)?;
    let positions = lag(&signals)?;
    let returns = prices.returns(config.return_kind);
    let equity = equity::compute(&positions, &returns)?;
    let metrics = evaluate(&equity, &config.metrics)?;

    tracing::info!(
        code = prices.code(),
        strategy = %config.strategy,
        periods = equity.len() - 1,
        sharpe = metrics.sharpe_ratio,
        "backtest complete"
    );

    Ok(BacktestResult {
        code: prices.code().to_string(),
        strategy: config.strategy,
        signals,
        positions,
        equity,
        metrics,
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioConfig {
    pub weights: WeightScheme,
    pub rebalance: Rebalance,
    pub metrics: MetricsConfig,
}

/// The same weights left to drift, for comparison with a rebalancing policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Benchmark {
    pub equity: EquityCurve,
    pub metrics: MetricsResult,
}

#[derive(Debug, Clone)]
pub struct PortfolioResult {
    pub weights: WeightVector,
    pub equity: EquityCurve,
    pub metrics: MetricsResult,
    /// `Rebalance::Never` run, present unless that is already the policy.
    pub benchmark: Option<Benchmark>,
    pub correlation: CorrelationMatrix,
    /// Buy-and-hold equity of each asset over the shared dates.
    pub asset_equity: BTreeMap<String, EquityCurve>,
    pub asset_metrics: BTreeMap<String, MetricsResult>,
}

impl PortfolioResult {
    pub fn asset_volatility(&self) -> BTreeMap<String, f64> {
        self.asset_metrics
            .iter()
            .map(|(code, m)| (code.clone(), m.annualized_volatility))
            .collect()
    }
}

/// Weighted buy-and-hold analysis of several assets, keyed by asset code.
pub fn run_portfolio(
    prices_by_asset: &BTreeMap<String, PriceSeries>,
    config: &PortfolioConfig,
) -> Result<PortfolioResult, QuantError> {
    let returns: BTreeMap<String, ReturnSeries> = prices_by_asset
        .iter()
        .map(|(code, prices)| (code.clone(), prices.returns(ReturnKind::Simple)))
        .collect();
    let aligned = align(&returns)?;

    let weights = config.weights.resolve(&aligned)?;
    weights.check_assets(aligned.keys())?;

    let portfolio_returns = aggregate_aligned(&aligned, &weights, config.rebalance)?;
    let equity = EquityCurve::from_returns(&portfolio_returns)?;
    let metrics = evaluate(&equity, &config.metrics)?;

    let benchmark = if config.rebalance == Rebalance::Never {
        None
    } else {
        let drift_returns = aggregate_aligned(&aligned, &weights, Rebalance::Never)?;
        let drift_equity = EquityCurve::from_returns(&drift_returns)?;
        let drift_metrics = evaluate(&drift_equity, &config.metrics)?;
        Some(Benchmark {
            equity: drift_equity,
            metrics: drift_metrics,
        })
    };

    let correlation = correlate_aligned(&aligned);

    let per_asset: Vec<(String, EquityCurve, MetricsResult)> = aligned
        .par_iter()
        .map(|(code, series)| -> Result<_, QuantError> {
            let curve = EquityCurve::from_returns(series)?;
            let m = evaluate(&curve, &config.metrics)?;
            Ok((code.clone(), curve, m))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut asset_equity = BTreeMap::new();
    let mut asset_metrics = BTreeMap::new();
    for (code, curve, m) in per_asset {
        asset_equity.insert(code.clone(), curve);
        asset_metrics.insert(code, m);
    }

    tracing::info!(
        assets = aligned.len(),
        periods = portfolio_returns.len(),
        rebalance = ?config.rebalance,
        sharpe = metrics.sharpe_ratio,
        "portfolio backtest complete"
    );

    Ok(PortfolioResult {
        weights,
        equity,
        metrics,
        benchmark,
        correlation,
        asset_equity,
        asset_metrics,
    })
}
