//! Market data port trait.

use crate::domain::error::EngineError;
use crate::domain::price_series::PriceSample;
use chrono::NaiveDate;

/// Source of daily closes.
pub trait MarketDataPort {
    /// Closes for `ticker` within `[start_date, end_date]`, sorted by date.
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceSample>, EngineError>;

    /// Daily volatility-index values. Sources without one return nothing,
    /// which disables the stress adjustment.
    fn fetch_volatility_index(
        &self,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<PriceSample>, EngineError> {
        Ok(Vec::new())
    }
}
