//! Portfolio weight vectors.

use std::collections::BTreeMap;
use std::str::FromStr;

use super::error::QuantError;
use super::metrics::sample_std;
use super::returns::ReturnSeries;

/// Absolute tolerance on `sum(weights) == 1`.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Non-negative weights keyed by asset code, summing to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector {
    weights: BTreeMap<String, f64>,
}

impl WeightVector {
    /// Validates caller-supplied weights. Weights that do not sum to 1 are
    /// rejected, never renormalized.
    pub fn custom(weights: BTreeMap<String, f64>) -> Result<Self, QuantError> {
        if weights.is_empty() {
            return Err(QuantError::invalid_parameter("weights", "no assets given"));
        }
        for (code, &w) in &weights {
            if !w.is_finite() || w < 0.0 {
                return Err(QuantError::invalid_parameter(
                    "weights",
                    format!("weight for {code} must be finite and non-negative, got {w}"),
                ));
            }
        }
        let sum: f64 = weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(QuantError::invalid_parameter(
                "weights",
                format!("weights must sum to 1, got {sum}"),
            ));
        }
        Ok(Self { weights })
    }

    pub fn equal<I, S>(assets: I) -> Result<Self, QuantError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = assets.into_iter().map(Into::into).collect();
        if codes.is_empty() {
            return Err(QuantError::invalid_parameter("weights", "no assets given"));
        }
        let w = 1.0 / codes.len() as f64;
        Ok(Self {
            weights: codes.into_iter().map(|c| (c, w)).collect(),
        })
    }

    /// Weights proportional to `1 / volatility` of each asset's returns.
    /// The series should already be aligned to a common date range.
    pub fn inverse_volatility(returns: &BTreeMap<String, ReturnSeries>) -> Result<Self, QuantError> {
        if returns.is_empty() {
            return Err(QuantError::invalid_parameter("weights", "no assets given"));
        }

        let mut inverse = BTreeMap::new();
        for (code, series) in returns {
            if series.len() < 2 {
                return Err(QuantError::insufficient(
                    &format!("volatility of {code}"),
                    series.len(),
                    2,
                ));
            }
            let vol = sample_std(&series.values());
            if vol == 0.0 || !vol.is_finite() {
                // a flat series carries no varying return to weight against
                return Err(QuantError::insufficient(
                    &format!("inverse-volatility weight of {code} (zero volatility)"),
                    0,
                    1,
                ));
            }
            inverse.insert(code.clone(), 1.0 / vol);
        }

        let total: f64 = inverse.values().sum();
        Ok(Self {
            weights: inverse.into_iter().map(|(c, v)| (c, v / total)).collect(),
        })
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.weights.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(c, &w)| (c.as_str(), w))
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Fails unless the weight keys are exactly `codes`.
    pub fn check_assets<'a, I>(&self, codes: I) -> Result<(), QuantError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let codes: Vec<&String> = codes.into_iter().collect();
        let matches = codes.len() == self.weights.len()
            && codes.iter().all(|c| self.weights.contains_key(c.as_str()));
        if matches {
            Ok(())
        } else {
            Err(QuantError::invalid_parameter(
                "weights",
                format!(
                    "weight assets {:?} do not match return assets {:?}",
                    self.weights.keys().collect::<Vec<_>>(),
                    codes
                ),
            ))
        }
    }
}

/// How the portfolio path derives its weights.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WeightScheme {
    #[default]
    Equal,
    InverseVolatility,
    Custom(BTreeMap<String, f64>),
}

impl WeightScheme {
    /// Resolves the scheme against aligned returns. Computed per call.
    pub fn resolve(&self, returns: &BTreeMap<String, ReturnSeries>) -> Result<WeightVector, QuantError> {
        match self {
            WeightScheme::Equal => WeightVector::equal(returns.keys().cloned()),
            WeightScheme::InverseVolatility => WeightVector::inverse_volatility(returns),
            WeightScheme::Custom(weights) => WeightVector::custom(weights.clone()),
        }
    }
}

impl FromStr for WeightScheme {
    type Err = QuantError;

    /// `equal`, `inverse_volatility`, or `CODE:weight, CODE:weight, ...`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => return Ok(WeightScheme::Equal),
            "inverse_volatility" | "risk_parity" => return Ok(WeightScheme::InverseVolatility),
            _ => {}
        }

        let mut weights = BTreeMap::new();
        for token in s.split(',') {
            let (code, value) = token.split_once(':').ok_or_else(|| {
                QuantError::invalid_parameter(
                    "weights",
                    format!("expected CODE:weight, got {:?}", token.trim()),
                )
            })?;
            let code = code.trim().to_uppercase();
            let value: f64 = value.trim().parse().map_err(|_| {
                QuantError::invalid_parameter(
                    "weights",
                    format!("invalid weight for {code}: {:?}", value.trim()),
                )
            })?;
            if code.is_empty() {
                return Err(QuantError::invalid_parameter("weights", "empty asset code"));
            }
            if weights.insert(code.clone(), value).is_some() {
                return Err(QuantError::invalid_parameter(
                    "weights",
                    format!("duplicate asset {code}"),
                ));
            }
        }
        Ok(WeightScheme::Custom(weights))
    }
}
