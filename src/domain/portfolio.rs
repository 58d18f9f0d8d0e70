//! Multi-asset return aggregation.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::error::QuantError;
use super::returns::{align, ReturnKind, ReturnPoint, ReturnSeries};
use super::weights::WeightVector;

/// When drifting weights are reset to their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rebalance {
    /// Target weights hold on every period.
    #[default]
    EveryPeriod,
    /// Set once at inception, then drift with asset returns.
    Never,
    /// Reset on the first bar of each ISO week, so a week whose Monday has no
    /// bar still resets on its first trading day.
    Weekly,
    /// Reset on the first bar of each calendar month.
    Monthly,
}

impl Rebalance {
    fn resets(self, prev: Option<NaiveDate>, date: NaiveDate) -> bool {
        let Some(prev) = prev else {
            return true;
        };
        match self {
            Rebalance::EveryPeriod => true,
            Rebalance::Never => false,
            Rebalance::Weekly => prev.iso_week() != date.iso_week(),
            Rebalance::Monthly => (prev.year(), prev.month()) != (date.year(), date.month()),
        }
    }
}

impl FromStr for Rebalance {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "period" | "every_period" => Ok(Rebalance::EveryPeriod),
            "none" | "never" => Ok(Rebalance::Never),
            "weekly" => Ok(Rebalance::Weekly),
            "monthly" => Ok(Rebalance::Monthly),
            other => Err(QuantError::invalid_parameter(
                "rebalance",
                format!("expected period, none, weekly or monthly, got {other:?}"),
            )),
        }
    }
}

/// Weighted sum of asset returns on every date all assets share.
pub fn aggregate(
    returns: &BTreeMap<String, ReturnSeries>,
    weights: &WeightVector,
) -> Result<ReturnSeries, QuantError> {
    aggregate_with_rebalancing(returns, weights, Rebalance::EveryPeriod)
}

pub fn aggregate_with_rebalancing(
    returns: &BTreeMap<String, ReturnSeries>,
    weights: &WeightVector,
    rebalance: Rebalance,
) -> Result<ReturnSeries, QuantError> {
    weights.check_assets(returns.keys())?;
    if let Some((code, _)) = returns.iter().find(|(_, s)| s.kind() != ReturnKind::Simple) {
        return Err(QuantError::invalid_parameter(
            "returns",
            format!("{code}: portfolio aggregation needs simple returns"),
        ));
    }

    let aligned = align(returns)?;
    aggregate_aligned(&aligned, weights, rebalance)
}

/// Aggregates series already restricted to identical dates.
pub(crate) fn aggregate_aligned(
    aligned: &BTreeMap<String, ReturnSeries>,
    weights: &WeightVector,
    rebalance: Rebalance,
) -> Result<ReturnSeries, QuantError> {
    let codes: Vec<&String> = aligned.keys().collect();
    let columns: Vec<&[ReturnPoint]> = aligned.values().map(|s| s.points()).collect();
    let target: Vec<f64> = codes
        .iter()
        .map(|c| weights.get(c.as_str()).unwrap_or(0.0))
        .collect();

    let Some(first) = columns.first() else {
        return Err(QuantError::invalid_parameter(
            "returns",
            "at least one asset is required",
        ));
    };
    let base_date = aligned
        .values()
        .map(|s| s.base_date())
        .max()
        .unwrap_or_else(|| first[0].date);

    let mut current = target.clone();
    let mut prev_date: Option<NaiveDate> = None;
    let mut points = Vec::with_capacity(first.len());

    for t in 0..first.len() {
        let date = first[t].date;
        if rebalance.resets(prev_date, date) {
            current.copy_from_slice(&target);
        }

        let value: f64 = columns
            .iter()
            .zip(&current)
            .map(|(col, w)| w * col[t].value)
            .sum();
        points.push(ReturnPoint { date, value });

        // Let holdings drift with their own returns, then renormalize.
        for (w, col) in current.iter_mut().zip(&columns) {
            *w *= 1.0 + col[t].value;
        }
        let total: f64 = current.iter().sum();
        if total > 0.0 {
            current.iter_mut().for_each(|w| *w /= total);
        }

        prev_date = Some(date);
    }

    tracing::debug!(
        assets = codes.len(),
        periods = points.len(),
        ?rebalance,
        "aggregated portfolio returns"
    );
    Ok(ReturnSeries::new(ReturnKind::Simple, base_date, points))
}
