//! Ledger events handed to journal subscribers.

use chrono::NaiveDate;

use crate::domain::piece::PieceKind;
use crate::domain::position::ClosedPosition;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LedgerEvent {
    Opened {
        ticker: String,
        kind: PieceKind,
        shares: u64,
        price: f64,
        day: usize,
        date: NaiveDate,
        tactical: bool,
    },
    Closed(ClosedPosition),
    Advanced {
        ticker: String,
        from: PieceKind,
        to: PieceKind,
        shares: u64,
        price: f64,
        day: usize,
        date: NaiveDate,
    },
    Reclaimed {
        ticker: String,
        kind: PieceKind,
        price: Option<f64>,
        day: usize,
        date: NaiveDate,
    },
}

impl LedgerEvent {
    pub fn ticker(&self) -> &str {
        match self {
            LedgerEvent::Opened { ticker, .. }
            | LedgerEvent::Advanced { ticker, .. }
            | LedgerEvent::Reclaimed { ticker, .. } => ticker,
            LedgerEvent::Closed(closed) => &closed.ticker,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            LedgerEvent::Opened { tactical: true, .. } => "OPEN_TACTICAL",
            LedgerEvent::Opened { .. } => "OPEN",
            LedgerEvent::Closed(_) => "CLOSE",
            LedgerEvent::Advanced { .. } => "ADVANCE",
            LedgerEvent::Reclaimed { .. } => "RECLAIM",
        }
    }

    pub fn day(&self) -> usize {
        match self {
            LedgerEvent::Opened { day, .. }
            | LedgerEvent::Advanced { day, .. }
            | LedgerEvent::Reclaimed { day, .. } => *day,
            LedgerEvent::Closed(closed) => closed.exit_day,
        }
    }
}
