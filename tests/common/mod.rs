#![allow(dead_code)]

use chrono::NaiveDate;
use quantdash::domain::error::QuantError;
use quantdash::domain::price_series::PriceSeries;
use quantdash::ports::data_port::PriceDataPort;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

pub struct MockPriceDataPort {
    pub data: HashMap<String, Vec<(NaiveDate, f64)>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, code: &str, start: &str, prices: &[f64]) -> Self {
        self.data.insert(code.to_string(), dated(start, prices));
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn fetch_prices(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, QuantError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(QuantError::Data {
                reason: reason.clone(),
            });
        }
        let pairs = self.data.get(code).ok_or_else(|| QuantError::Data {
            reason: format!("no data for {code}"),
        })?;
        PriceSeries::from_pairs(
            code,
            pairs.iter().copied().filter(|&(d, _)| {
                start_date.is_none_or(|s| d >= s) && end_date.is_none_or(|e| d <= e)
            }),
        )
    }

    fn list_codes(&self) -> Result<Vec<String>, QuantError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting at `start` (YYYY-MM-DD).
pub fn dated(start: &str, prices: &[f64]) -> Vec<(NaiveDate, f64)> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| (start + chrono::Duration::days(i as i64), p))
        .collect()
}

pub fn series(code: &str, start: &str, prices: &[f64]) -> PriceSeries {
    PriceSeries::from_pairs(code, dated(start, prices)).unwrap()
}

/// Rebuilds a price path from simple returns, starting at 100.
pub fn from_returns(code: &str, start: &str, returns: &[f64]) -> PriceSeries {
    let mut prices = vec![100.0];
    for r in returns {
        let last = *prices.last().unwrap();
        prices.push(last * (1.0 + r));
    }
    series(code, start, &prices)
}

pub fn universe(entries: &[PriceSeries]) -> BTreeMap<String, PriceSeries> {
    entries
        .iter()
        .map(|s| (s.code().to_string(), s.clone()))
        .collect()
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_price_csv(dir: &Path, code: &str, start: &str, prices: &[f64]) {
    let mut body = String::from("date,close\n");
    for (d, p) in dated(start, prices) {
        body.push_str(&format!("{d},{p}\n"));
    }
    std::fs::write(dir.join(format!("{code}.csv")), body).unwrap();
}
