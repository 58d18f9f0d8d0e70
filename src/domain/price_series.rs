//! Validated, immutable price series for one asset.

use chrono::NaiveDate;

use super::error::QuantError;
use super::returns::{ReturnKind, ReturnPoint, ReturnSeries};

/// Minimum observations for a series: one return needs two prices.
pub const MIN_PRICE_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Strictly date-ordered, positive, finite prices. Construction is the only
/// place validation happens, so every `PriceSeries` in circulation is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(code: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, QuantError> {
        let code = code.into();

        if points.len() < MIN_PRICE_POINTS {
            return Err(QuantError::invalid_input(format!(
                "{code}: need at least {MIN_PRICE_POINTS} prices, got {}",
                points.len()
            )));
        }

        for (i, point) in points.iter().enumerate() {
            if !point.price.is_finite() || point.price <= 0.0 {
                return Err(QuantError::invalid_input(format!(
                    "{code}: price on {} must be positive and finite, got {}",
                    point.date, point.price
                )));
            }
            if i > 0 && point.date <= points[i - 1].date {
                return Err(QuantError::invalid_input(format!(
                    "{code}: dates must be strictly increasing ({} follows {})",
                    point.date,
                    points[i - 1].date
                )));
            }
        }

        Ok(Self { code, points })
    }

    /// Builds a series from parallel `(date, price)` pairs.
    pub fn from_pairs(
        code: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, QuantError> {
        let points = pairs
            .into_iter()
            .map(|(date, price)| PricePoint { date, price })
            .collect();
        Self::new(code, points)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.price)
    }

    /// Period-over-period returns, one per consecutive pair, dated at the
    /// later observation.
    pub fn returns(&self, kind: ReturnKind) -> ReturnSeries {
        let points = self
            .points
            .windows(2)
            .map(|w| ReturnPoint {
                date: w[1].date,
                value: kind.between(w[0].price, w[1].price),
            })
            .collect();
        ReturnSeries::new(kind, self.first_date(), points)
    }

    /// Prices rescaled so the first observation is 1.0.
    pub fn normalized(&self) -> Vec<PricePoint> {
        let base = self.points[0].price;
        self.points
            .iter()
            .map(|p| PricePoint {
                date: p.date,
                price: p.price / base,
            })
            .collect()
    }
}
