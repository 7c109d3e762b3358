//! Daily close series and the aligned market panel.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PriceSample {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub ticker: String,
    pub samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, mut samples: Vec<PriceSample>) -> Self {
        samples.sort_by_key(|s| s.date);
        samples.dedup_by_key(|s| s.date);
        PriceSeries {
            ticker: ticker.into(),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

pub fn build_unified_timeline(series: &[PriceSeries]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.samples.iter().map(|sample| sample.date))
        .collect();
    unique_dates.into_iter().collect()
}

/// Closes of every ticker aligned on one timeline.
///
/// Gaps after a ticker's first sample are forward-filled; days before it are
/// `None`. The volatility index is aligned the same way.
#[derive(Debug, Clone)]
pub struct MarketPanel {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub closes: Vec<Vec<Option<f64>>>,
    pub volatility_index: Vec<Option<f64>>,
}

impl MarketPanel {
    pub fn align(series: &[PriceSeries], volatility_index: &[PriceSample]) -> Self {
        let dates = build_unified_timeline(series);
        let closes = series
            .iter()
            .map(|s| forward_fill(&dates, &s.samples))
            .collect();
        let volatility_index = forward_fill(&dates, volatility_index);

        MarketPanel {
            tickers: series.iter().map(|s| s.ticker.clone()).collect(),
            dates,
            closes,
            volatility_index,
        }
    }

    pub fn day_count(&self) -> usize {
        self.dates.len()
    }
}

fn forward_fill(dates: &[NaiveDate], samples: &[PriceSample]) -> Vec<Option<f64>> {
    let by_date: HashMap<NaiveDate, f64> = samples.iter().map(|s| (s.date, s.close)).collect();
    let mut last = None;
    dates
        .iter()
        .map(|d| {
            if let Some(&close) = by_date.get(d) {
                last = Some(close);
            }
            last
        })
        .collect()
}
