//! CSV price file adapter.
//!
//! One `<TICKER>.csv` per instrument with a header row. The `date` column
//! (YYYY-MM-DD) and the close column are located by name; `close` is
//! preferred over `adj_close`. Other columns are ignored.

use crate::domain::error::EngineError;
use crate::domain::price_series::PriceSample;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const CLOSE_COLUMNS: [&str; 3] = ["close", "adj_close", "adj close"];

pub struct CsvPriceAdapter {
    base_path: PathBuf,
    volatility_index: Option<String>,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            volatility_index: None,
        }
    }

    /// Reads the volatility index from `<name>.csv` in the same directory.
    pub fn with_volatility_index(mut self, name: impl Into<String>) -> Self {
        self.volatility_index = Some(name.into());
        self
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    fn read_series(
        &self,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceSample>, EngineError> {
        let path = self.csv_path(name);
        let content = fs::read_to_string(&path).map_err(|e| EngineError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| EngineError::Data {
                reason: format!("{}: CSV header error: {}", path.display(), e),
            })?
            .clone();
        let column = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let date_col = column(&["date"]).ok_or_else(|| EngineError::Data {
            reason: format!("{}: missing date column", path.display()),
        })?;
        let close_col = CLOSE_COLUMNS
            .iter()
            .find_map(|name| column(&[*name]))
            .ok_or_else(|| EngineError::Data {
                reason: format!("{}: missing close column", path.display()),
            })?;

        let mut samples = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| EngineError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let date_str = record.get(date_col).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                EngineError::Data {
                    reason: format!("{}: invalid date '{}': {}", path.display(), date_str, e),
                }
            })?;
            if date < start_date || date > end_date {
                continue;
            }

            let close_str = record.get(close_col).unwrap_or_default();
            if close_str.is_empty() {
                continue;
            }
            let close: f64 = close_str.parse().map_err(|e| EngineError::Data {
                reason: format!("{}: invalid close '{}': {}", path.display(), close_str, e),
            })?;
            if !close.is_finite() || close <= 0.0 {
                return Err(EngineError::Data {
                    reason: format!("{}: non-positive close on {}", path.display(), date),
                });
            }

            samples.push(PriceSample { date, close });
        }

        samples.sort_by_key(|s| s.date);
        Ok(samples)
    }
}

impl MarketDataPort for CsvPriceAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceSample>, EngineError> {
        self.read_series(ticker, start_date, end_date)
    }

    fn fetch_volatility_index(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceSample>, EngineError> {
        match &self.volatility_index {
            Some(name) => self.read_series(name, start_date, end_date),
            None => Ok(Vec::new()),
        }
    }
}
