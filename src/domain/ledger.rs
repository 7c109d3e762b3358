//! Position ledger: at most one open position per instrument plus the history
//! of closed ones.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::error::EngineError;
use crate::domain::inventory::PieceInventory;
use crate::domain::position::{CloseReason, ClosedPosition, Position};

/// Price and day a position is closed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub price: f64,
    pub day: usize,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    open: BTreeMap<String, Position>,
    closed: Vec<ClosedPosition>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, position: Position) -> Result<&Position, EngineError> {
        if self.open.contains_key(&position.ticker) {
            return Err(EngineError::DuplicatePosition {
                ticker: position.ticker,
            });
        }
        let ticker = position.ticker.clone();
        Ok(self.open.entry(ticker).or_insert(position))
    }

    /// Removes the open position, returns its unit to `inventory` and records
    /// the close.
    pub fn close(
        &mut self,
        ticker: &str,
        reason: CloseReason,
        fill: ExitFill,
        inventory: &mut PieceInventory,
    ) -> Result<ClosedPosition, EngineError> {
        let position = self
            .open
            .remove(ticker)
            .ok_or_else(|| EngineError::NoPosition {
                ticker: ticker.to_string(),
            })?;
        inventory.release(position.piece);

        let closed = ClosedPosition {
            pnl: position.unrealized_pnl(fill.price),
            ticker: position.ticker,
            kind: position.kind,
            shares: position.shares,
            entry_price: position.entry_price,
            exit_price: fill.price,
            entry_day: position.entry_day,
            exit_day: fill.day,
            entry_date: position.entry_date,
            exit_date: fill.date,
            was_tactical: position.state.is_tactical(),
            reason,
            state: reason.terminal_state(),
        };
        self.closed.push(closed.clone());
        Ok(closed)
    }

    pub fn get(&self, ticker: &str) -> Option<&Position> {
        self.open.get(ticker)
    }

    pub(crate) fn get_mut(&mut self, ticker: &str) -> Option<&mut Position> {
        self.open.get_mut(ticker)
    }

    pub(crate) fn positions_mut(&mut self) -> impl Iterator<Item = &mut Position> {
        self.open.values_mut()
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.open.contains_key(ticker)
    }

    /// Open positions in ticker order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.open.values()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn closed(&self) -> &[ClosedPosition] {
        &self.closed
    }

    pub fn realized_pnl(&self) -> f64 {
        self.closed.iter().map(|c| c.pnl).sum()
    }
}
