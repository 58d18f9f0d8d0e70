//! Positions: signals lagged one period.
//!
//! The position held over bar `i` is the signal observed at bar `i - 1`, so a
//! bar's own close never drives the exposure it is measured against.

use chrono::NaiveDate;

use super::error::QuantError;
use super::signal::SignalSeries;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSeries {
    points: Vec<PositionPoint>,
}

impl PositionSeries {
    pub fn points(&self) -> &[PositionPoint] {
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

pub fn lag(signal: &SignalSeries) -> Result<PositionSeries, QuantError> {
    let defined = signal.defined_count();
    if defined < 2 {
        return Err(QuantError::insufficient("position lag", defined, 2));
    }

    let signals = signal.points();
    let points = signals
        .iter()
        .enumerate()
        .map(|(i, s)| PositionPoint {
            date: s.date,
            value: if i == 0 { None } else { signals[i - 1].value },
        })
        .collect();

    Ok(PositionSeries { points })
}
