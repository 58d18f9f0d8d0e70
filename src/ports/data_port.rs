//! Price data port trait.

use crate::domain::error::QuantError;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;

/// Supplies one validated price series per asset. Implementations must build
/// the result through [`PriceSeries::new`] so the engine never sees
/// unvalidated data.
pub trait PriceDataPort {
    fn fetch_prices(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, QuantError>;

    fn list_codes(&self) -> Result<Vec<String>, QuantError>;
}
