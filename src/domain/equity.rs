//! Equity curves from positions and returns.

use chrono::NaiveDate;

use super::error::QuantError;
use super::position::PositionSeries;
use super::returns::ReturnSeries;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Growth of one unit of capital. The first point is always 1.0 and sits on
/// the observation before the first traded return. Ruin is absorbing: once a
/// period's growth factor reaches zero or below, equity is 0.0 from then on.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    /// Compounds `returns` at full exposure.
    pub fn from_returns(returns: &ReturnSeries) -> Result<Self, QuantError> {
        if returns.is_empty() {
            return Err(QuantError::EmptySeries {
                context: "returns".to_string(),
            });
        }
        let kind = returns.kind();
        let mut equity = 1.0;
        let mut points = Vec::with_capacity(returns.len() + 1);
        points.push(EquityPoint {
            date: returns.base_date(),
            equity,
        });
        for r in returns.points() {
            equity = compound(equity, kind.growth(1.0, r.value));
            points.push(EquityPoint {
                date: r.date,
                equity,
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    pub fn final_equity(&self) -> f64 {
        self.points.last().map_or(1.0, |p| p.equity)
    }

    /// `curve[t] / curve[t-1] - 1` for every consecutive pair. The period that
    /// wipes out capital returns -1; periods after ruin hold no capital and
    /// return 0.
    pub fn period_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| {
                let prev = w[0].equity;
                if prev > 0.0 {
                    w[1].equity / prev - 1.0
                } else {
                    0.0
                }
            })
            .collect()
    }
}

fn compound(equity: f64, growth: f64) -> f64 {
    if equity <= 0.0 || growth <= 0.0 {
        0.0
    } else {
        equity * growth
    }
}

/// Compounds each defined position against the return on the same date.
/// Dates missing from either side, or with no position, are skipped.
pub fn compute(positions: &PositionSeries, returns: &ReturnSeries) -> Result<EquityCurve, QuantError> {
    let kind = returns.kind();
    let rets = returns.points();

    let mut points: Vec<EquityPoint> = Vec::new();
    let mut equity = 1.0;
    let mut j = 0;

    for pos in positions.points() {
        let Some(exposure) = pos.value else {
            continue;
        };
        while j < rets.len() && rets[j].date < pos.date {
            j += 1;
        }
        if j >= rets.len() {
            break;
        }
        if rets[j].date != pos.date {
            continue;
        }

        if points.is_empty() {
            points.push(EquityPoint {
                date: returns.anchor_date(j),
                equity,
            });
        }
        equity = compound(equity, kind.growth(exposure, rets[j].value));
        points.push(EquityPoint {
            date: pos.date,
            equity,
        });
    }

    if points.is_empty() {
        return Err(QuantError::EmptySeries {
            context: "positions with returns".to_string(),
        });
    }

    tracing::debug!(
        aligned = points.len() - 1,
        final_equity = equity,
        "computed equity curve"
    );
    Ok(EquityCurve { points })
}
