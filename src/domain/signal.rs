//! Strategy signals.
//!
//! Strategies are a closed set, dispatched from [`generate`]. Signals that
//! cannot be computed yet (inside the momentum warmup) are `None`, never zero:
//! "no view" and "flat" are different things downstream.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use super::error::QuantError;
use super::price_series::PriceSeries;

/// How a momentum trailing return maps to a signal strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalMode {
    /// +1 / 0 / -1 by the sign of the trailing return.
    #[default]
    Sign,
    /// 1 when the trailing return is positive, otherwise 0.
    LongOnly,
    /// The trailing return itself.
    Magnitude,
}

impl SignalMode {
    fn apply(self, trailing: f64) -> f64 {
        match self {
            SignalMode::Sign => {
                if trailing > 0.0 {
                    1.0
                } else if trailing < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            SignalMode::LongOnly => {
                if trailing > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            SignalMode::Magnitude => trailing,
        }
    }
}

impl FromStr for SignalMode {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sign" => Ok(SignalMode::Sign),
            "long_only" => Ok(SignalMode::LongOnly),
            "magnitude" => Ok(SignalMode::Magnitude),
            other => Err(QuantError::invalid_parameter(
                "signal",
                format!("expected sign, long_only or magnitude, got {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    BuyAndHold,
    Momentum { lookback: usize, mode: SignalMode },
}

impl StrategyKind {
    pub fn momentum(lookback: usize) -> Self {
        StrategyKind::Momentum {
            lookback,
            mode: SignalMode::default(),
        }
    }

    /// Leading observations with no signal.
    pub fn warmup(&self) -> usize {
        match self {
            StrategyKind::BuyAndHold => 0,
            StrategyKind::Momentum { lookback, .. } => *lookback,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::BuyAndHold => write!(f, "Buy & Hold"),
            StrategyKind::Momentum { lookback, mode } => {
                write!(f, "Momentum({lookback}, {mode:?})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// One entry per price observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSeries {
    points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn new(points: Vec<SignalPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[SignalPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn defined_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }
}

pub fn generate(prices: &PriceSeries, strategy: &StrategyKind) -> Result<SignalSeries, QuantError> {
    let points = match *strategy {
        StrategyKind::BuyAndHold => prices
            .points()
            .iter()
            .map(|p| SignalPoint {
                date: p.date,
                value: Some(1.0),
            })
            .collect(),
        StrategyKind::Momentum { lookback, mode } => momentum(prices, lookback, mode)?,
    };

    let series = SignalSeries::new(points);
    tracing::debug!(
        code = prices.code(),
        %strategy,
        defined = series.defined_count(),
        "generated signals"
    );
    Ok(series)
}

fn momentum(
    prices: &PriceSeries,
    lookback: usize,
    mode: SignalMode,
) -> Result<Vec<SignalPoint>, QuantError> {
    if lookback < 1 {
        return Err(QuantError::invalid_parameter(
            "lookback",
            "must be at least 1",
        ));
    }
    if lookback >= prices.len() {
        return Err(QuantError::invalid_parameter(
            "lookback",
            format!(
                "lookback {lookback} leaves no signal for a series of {} prices",
                prices.len()
            ),
        ));
    }

    let points = prices.points();
    Ok(points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let value = (i >= lookback).then(|| {
                let trailing = p.price / points[i - lookback].price - 1.0;
                mode.apply(trailing)
            });
            SignalPoint {
                date: p.date,
                value,
            }
        })
        .collect())
}
