//! Linear price extrapolation.
//!
//! A baseline forecast: an ordinary least-squares line through the last
//! `lookback` prices, extended `horizon` periods past the final observation.

use super::error::QuantError;
use super::price_series::PriceSeries;

pub const DEFAULT_FORECAST_HORIZON: usize = 30;
pub const DEFAULT_FORECAST_LOOKBACK: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastConfig {
    pub horizon: usize,
    pub lookback: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_FORECAST_HORIZON,
            lookback: DEFAULT_FORECAST_LOOKBACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    /// Periods after the last observed price, starting at 1.
    pub step: usize,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearForecast {
    /// Price change per period of the fitted line.
    pub slope: f64,
    /// Fitted value at the last observed price.
    pub fitted_last: f64,
    pub points: Vec<ForecastPoint>,
}

pub fn linear_forecast(
    prices: &PriceSeries,
    config: &ForecastConfig,
) -> Result<LinearForecast, QuantError> {
    if config.horizon < 1 {
        return Err(QuantError::invalid_parameter(
            "forecast_horizon",
            "horizon must be at least 1",
        ));
    }
    if config.lookback < 2 {
        return Err(QuantError::invalid_parameter(
            "forecast_lookback",
            "a line needs at least 2 prices",
        ));
    }
    if config.lookback > prices.len() {
        return Err(QuantError::insufficient(
            "linear forecast",
            prices.len(),
            config.lookback,
        ));
    }

    let window: Vec<f64> = prices.prices().skip(prices.len() - config.lookback).collect();
    let (slope, intercept) = least_squares(&window);
    let last_x = (window.len() - 1) as f64;

    let points = (1..=config.horizon)
        .map(|step| ForecastPoint {
            step,
            price: intercept + slope * (last_x + step as f64),
        })
        .collect();

    tracing::debug!(
        code = prices.code(),
        lookback = config.lookback,
        horizon = config.horizon,
        slope,
        "fitted linear forecast"
    );

    Ok(LinearForecast {
        slope,
        fitted_last: intercept + slope * last_x,
        points,
    })
}

/// Fits `y = intercept + slope * x` with `x = 0, 1, ..`. Needs two or more values.
fn least_squares(y: &[f64]) -> (f64, f64) {
    let n = y.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n;

    let (sxy, sxx) = y
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &yi)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (yi - y_mean), sxx + dx * dx)
        });

    let slope = sxy / sxx;
    (slope, y_mean - slope * x_mean)
}
