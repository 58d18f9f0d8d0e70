//! Pairwise Pearson correlation of asset returns.

use std::collections::BTreeMap;

use super::error::QuantError;
use super::returns::{align, ReturnSeries};

/// Symmetric correlation matrix. Undefined pairs (fewer than two shared
/// points, or a series with zero variance) hold `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    assets: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.assets.iter().position(|x| x == a)?;
        let j = self.assets.iter().position(|x| x == b)?;
        Some(self.values[i][j])
    }

    /// Row-major values in `assets()` order.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }
}

/// Correlates every pair over the dates all assets share.
pub fn correlate(returns: &BTreeMap<String, ReturnSeries>) -> Result<CorrelationMatrix, QuantError> {
    let aligned = align(returns)?;
    Ok(correlate_aligned(&aligned))
}

pub(crate) fn correlate_aligned(aligned: &BTreeMap<String, ReturnSeries>) -> CorrelationMatrix {
    let assets: Vec<String> = aligned.keys().cloned().collect();
    let columns: Vec<Vec<f64>> = aligned.values().map(|s| s.values()).collect();
    let n = assets.len();

    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                if has_variance(&columns[i]) { 1.0 } else { f64::NAN }
            } else {
                pearson(&columns[i], &columns[j])
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix { assets, values }
}

fn has_variance(x: &[f64]) -> bool {
    x.len() >= 2 && x.iter().any(|&v| v != x[0])
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    if !has_variance(x) || !has_variance(y) {
        return f64::NAN;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}
