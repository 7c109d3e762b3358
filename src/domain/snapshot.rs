//! Per-day instrument snapshots: the score and board coordinate of every
//! ticker, computed once per loaded day.

use chrono::NaiveDate;

use crate::domain::board::{BoardCoordinate, Zone, map_coordinate};
use crate::domain::indicator::daily_returns;
use crate::domain::price_series::MarketPanel;
use crate::domain::score::{
    InstrumentSignals, RawSignals, ScoreComponents, ScoreWeights, compute_signals, score_universe,
};

/// Scored part of a snapshot; absent while the trailing window is short.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TileSignal {
    pub moving_average: f64,
    pub raw: RawSignals,
    pub components: ScoreComponents,
    pub coordinate: BoardCoordinate,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InstrumentSnapshot {
    pub ticker: String,
    pub price: Option<f64>,
    pub signal: Option<TileSignal>,
}

impl InstrumentSnapshot {
    pub fn score(&self) -> Option<f64> {
        self.signal.map(|s| s.components.score)
    }

    pub fn zone(&self) -> Option<Zone> {
        self.signal.map(|s| s.coordinate.zone)
    }

    pub fn rank(&self) -> Option<u8> {
        self.signal.map(|s| s.coordinate.rank)
    }

    pub fn is_defined(&self) -> bool {
        self.signal.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DayBoard {
    pub day: usize,
    pub date: NaiveDate,
    pub volatility_index: Option<f64>,
    pub weights: ScoreWeights,
    pub snapshots: Vec<InstrumentSnapshot>,
}

impl DayBoard {
    pub fn snapshot(&self, ticker: &str) -> Option<&InstrumentSnapshot> {
        self.snapshots.iter().find(|s| s.ticker == ticker)
    }

    pub fn undefined_tickers(&self) -> Vec<String> {
        self.snapshots
            .iter()
            .filter(|s| !s.is_defined())
            .map(|s| s.ticker.clone())
            .collect()
    }
}

/// Scores and maps every day of the panel.
pub fn build_day_boards(panel: &MarketPanel, period: usize, stress_threshold: f64) -> Vec<DayBoard> {
    let returns: Vec<Vec<f64>> = panel.closes.iter().map(|c| daily_returns(c)).collect();

    (0..panel.day_count())
        .map(|day| {
            let signals: Vec<Option<InstrumentSignals>> = panel
                .closes
                .iter()
                .zip(&returns)
                .map(|(closes, rets)| compute_signals(closes, rets, day, period))
                .collect();
            let raw: Vec<Option<RawSignals>> = signals.iter().map(|s| s.map(|s| s.raw)).collect();

            let volatility_index = panel.volatility_index.get(day).copied().flatten();
            let weights = ScoreWeights::for_index(volatility_index, stress_threshold);
            let components = score_universe(&raw, weights);

            let snapshots = panel
                .tickers
                .iter()
                .enumerate()
                .map(|(i, ticker)| {
                    let signal = signals[i].zip(components[i]).map(|(sig, comp)| TileSignal {
                        moving_average: sig.moving_average,
                        raw: sig.raw,
                        components: comp,
                        coordinate: map_coordinate(
                            comp.score,
                            comp.volatility_norm,
                            sig.price,
                            sig.moving_average,
                        ),
                    });
                    InstrumentSnapshot {
                        ticker: ticker.clone(),
                        price: panel.closes[i][day],
                        signal,
                    }
                })
                .collect();

            DayBoard {
                day,
                date: panel.dates[day],
                volatility_index,
                weights,
                snapshots,
            }
        })
        .collect()
}
