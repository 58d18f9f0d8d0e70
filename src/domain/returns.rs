//! Period-over-period return series and cross-asset date alignment.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use super::error::QuantError;

/// How a return is measured between two consecutive prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnKind {
    /// `p1 / p0 - 1`
    #[default]
    Simple,
    /// `ln(p1 / p0)`
    Log,
}

impl ReturnKind {
    pub fn between(self, prev: f64, curr: f64) -> f64 {
        match self {
            ReturnKind::Simple => curr / prev - 1.0,
            ReturnKind::Log => (curr / prev).ln(),
        }
    }

    /// Growth factor one unit of capital sees from `exposure * r`.
    pub fn growth(self, exposure: f64, r: f64) -> f64 {
        match self {
            ReturnKind::Simple => 1.0 + exposure * r,
            ReturnKind::Log => (exposure * r).exp(),
        }
    }
}

impl FromStr for ReturnKind {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(ReturnKind::Simple),
            "log" => Ok(ReturnKind::Log),
            other => Err(QuantError::invalid_parameter(
                "returns",
                format!("expected simple or log, got {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Returns dated at the later price of each pair. `base_date` is the date of
/// the price the first return is measured from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    kind: ReturnKind,
    base_date: NaiveDate,
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(kind: ReturnKind, base_date: NaiveDate, points: Vec<ReturnPoint>) -> Self {
        Self {
            kind,
            base_date,
            points,
        }
    }

    pub fn kind(&self) -> ReturnKind {
        self.kind
    }

    pub fn base_date(&self) -> NaiveDate {
        self.base_date
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].value)
    }

    /// Date of the observation preceding return `index`.
    pub fn anchor_date(&self, index: usize) -> NaiveDate {
        if index == 0 {
            self.base_date
        } else {
            self.points[index - 1].date
        }
    }

    /// Keeps only the returns whose dates are in `dates`.
    pub fn restrict_to(&self, dates: &BTreeSet<NaiveDate>) -> ReturnSeries {
        let first_kept = self.points.iter().position(|p| dates.contains(&p.date));
        let base_date = first_kept.map_or(self.base_date, |i| self.anchor_date(i));
        let points = self
            .points
            .iter()
            .filter(|p| dates.contains(&p.date))
            .copied()
            .collect();
        ReturnSeries::new(self.kind, base_date, points)
    }
}

/// Dates present in every series (inner join).
pub fn common_dates<'a, I>(series: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = &'a ReturnSeries>,
{
    let mut iter = series.into_iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    let mut common: BTreeSet<NaiveDate> = first.points.iter().map(|p| p.date).collect();
    for s in iter {
        let dates: BTreeSet<NaiveDate> = s.points.iter().map(|p| p.date).collect();
        common.retain(|d| dates.contains(d));
    }
    common
}

/// Restricts every series to the shared dates. Fails with `NoOverlap` when
/// the intersection is empty.
pub fn align(
    returns: &BTreeMap<String, ReturnSeries>,
) -> Result<BTreeMap<String, ReturnSeries>, QuantError> {
    if returns.is_empty() {
        return Err(QuantError::invalid_parameter(
            "returns",
            "at least one asset is required",
        ));
    }

    let common = common_dates(returns.values());
    if common.is_empty() {
        return Err(QuantError::NoOverlap {
            assets: returns.len(),
        });
    }

    tracing::debug!(
        assets = returns.len(),
        common_dates = common.len(),
        "aligned return series"
    );

    Ok(returns
        .iter()
        .map(|(code, series)| (code.clone(), series.restrict_to(&common)))
        .collect())
}
