//! CSV file price data adapter.
//!
//! Each asset lives in `<base_path>/<CODE>.csv` with a header row. The date
//! column is `date` (or the first column); the price column is `close`,
//! `adj_close` or `price` (or the second column).

use crate::domain::error::QuantError;
use crate::domain::price_series::PriceSeries;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const PRICE_HEADERS: [&str; 3] = ["close", "adj_close", "price"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

fn column_index(headers: &csv::StringRecord, names: &[&str], fallback: usize) -> usize {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        .unwrap_or(fallback)
}

fn data_error(reason: String) -> QuantError {
    QuantError::Data { reason }
}

impl PriceDataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, QuantError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_error(format!("CSV header error in {}: {}", path.display(), e)))?
            .clone();
        let date_col = column_index(&headers, &["date"], 0);
        let price_col = column_index(&headers, &PRICE_HEADERS, 1);

        let mut pairs = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            // header is line 1
            let line = row + 2;

            let date_str = record
                .get(date_col)
                .ok_or_else(|| data_error(format!("line {line}: missing date column")))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| data_error(format!("line {line}: invalid date {date_str:?}: {e}")))?;

            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            let price_str = record
                .get(price_col)
                .ok_or_else(|| data_error(format!("line {line}: missing price column")))?;
            let price: f64 = price_str
                .trim()
                .parse()
                .map_err(|e| data_error(format!("line {line}: invalid price {price_str:?}: {e}")))?;

            pairs.push((date, price));
        }

        pairs.sort_by_key(|&(date, _)| date);
        tracing::debug!(code, rows = pairs.len(), path = %path.display(), "read price file");

        PriceSeries::from_pairs(code, pairs)
    }

    fn list_codes(&self) -> Result<Vec<String>, QuantError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut codes = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                codes.push(stem.to_string_lossy().into_owned());
            }
        }

        codes.sort();
        Ok(codes)
    }
}
