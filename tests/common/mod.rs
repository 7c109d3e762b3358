#![allow(dead_code)]

use chesstrader::domain::config::{EngineConfig, RiskLevel};
use chesstrader::domain::engine::Engine;
use chesstrader::domain::error::EngineError;
use chesstrader::domain::event::LedgerEvent;
pub use chesstrader::domain::price_series::PriceSample;
use chesstrader::ports::data_port::MarketDataPort;
use chesstrader::ports::journal_port::JournalPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub const MA_PERIOD: usize = 10;
pub const FIRST_DAY: usize = MA_PERIOD - 1;

pub struct MockMarketData {
    pub closes: HashMap<String, Vec<PriceSample>>,
    pub errors: HashMap<String, String>,
    pub vix: Vec<PriceSample>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            closes: HashMap::new(),
            errors: HashMap::new(),
            vix: Vec::new(),
        }
    }

    pub fn with_closes(mut self, ticker: &str, closes: &[f64]) -> Self {
        self.closes.insert(ticker.to_string(), samples(closes));
        self
    }

    /// Closes that start `offset` days into the timeline.
    pub fn with_closes_from(mut self, ticker: &str, offset: usize, closes: &[f64]) -> Self {
        let shifted = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceSample {
                date: day(offset + i),
                close,
            })
            .collect();
        self.closes.insert(ticker.to_string(), shifted);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn with_vix(mut self, values: &[f64]) -> Self {
        self.vix = samples(values);
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceSample>, EngineError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(EngineError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .closes
            .get(ticker)
            .map(|s| {
                s.iter()
                    .filter(|x| x.date >= start_date && x.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_volatility_index(
        &self,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<PriceSample>, EngineError> {
        Ok(self.vix.clone())
    }
}

/// Collects every event it is handed.
#[derive(Default)]
pub struct RecordingJournal {
    pub events: Vec<LedgerEvent>,
    pub flushed: bool,
}

impl JournalPort for RecordingJournal {
    fn record(&mut self, event: &LedgerEvent) -> Result<(), EngineError> {
        self.events.push(event.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EngineError> {
        self.flushed = true;
        Ok(())
    }
}

pub fn day(index: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(index as i64)
}

pub fn start_date() -> NaiveDate {
    day(0)
}

pub fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

pub fn samples(closes: &[f64]) -> Vec<PriceSample> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceSample {
            date: day(i),
            close,
        })
        .collect()
}

/// `start, start + step, ...` for `days` days.
pub fn linear(start: f64, step: f64, days: usize) -> Vec<f64> {
    (0..days).map(|i| start + step * i as f64).collect()
}

/// 100, 101, ..., 109 and then +3 a day: always above its average.
pub fn steady_riser(days: usize) -> Vec<f64> {
    (0..days)
        .map(|i| {
            if i < MA_PERIOD {
                100.0 + i as f64
            } else {
                109.0 + 3.0 * (i - FIRST_DAY) as f64
            }
        })
        .collect()
}

/// Flat at 100 through the first usable day, then +30 a day.
pub fn late_surger(days: usize) -> Vec<f64> {
    (0..days)
        .map(|i| {
            if i < MA_PERIOD {
                100.0
            } else {
                100.0 + 30.0 * (i - FIRST_DAY) as f64
            }
        })
        .collect()
}

/// Rises through the first usable day, then drops 10 a day.
pub fn rise_then_crash(days: usize) -> Vec<f64> {
    (0..days)
        .map(|i| {
            if i < MA_PERIOD {
                100.0 + i as f64
            } else {
                109.0 - 10.0 * (i - FIRST_DAY) as f64
            }
        })
        .collect()
}

/// Falls through the first usable day, then jumps well above its average.
pub fn dip_then_recover(days: usize) -> Vec<f64> {
    (0..days)
        .map(|i| {
            if i < MA_PERIOD {
                100.0 - i as f64
            } else {
                91.0 + 15.0 * (i - FIRST_DAY) as f64
            }
        })
        .collect()
}

pub fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn engine_config(names: &[&str]) -> EngineConfig {
    EngineConfig::new(
        tickers(names),
        100_000.0,
        RiskLevel::Moderate.allocation(),
        MA_PERIOD,
    )
}

pub fn loaded_engine(config: EngineConfig, data: &MockMarketData) -> Engine {
    let mut engine = Engine::initialize(config).unwrap();
    engine
        .load_market_data(data, start_date(), end_date())
        .unwrap();
    engine
}

pub fn advance_to(engine: &mut Engine, target: usize) {
    while engine.current_day() < target {
        engine.advance_day().unwrap();
    }
}
