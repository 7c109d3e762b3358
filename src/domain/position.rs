//! Open positions, their lifecycle state, and closed-position records.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::board::Zone;
use crate::domain::piece::{PieceId, PieceKind};

/// Lifecycle of a position. Open states first, then terminal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PositionState {
    DeployedFavorable,
    DeployedTactical { unfavorable_days: u32 },
    Retreated,
    AutoRetreated,
    Captured,
}

impl PositionState {
    pub fn is_open(self) -> bool {
        matches!(
            self,
            PositionState::DeployedFavorable | PositionState::DeployedTactical { .. }
        )
    }

    pub fn is_tactical(self) -> bool {
        matches!(self, PositionState::DeployedTactical { .. })
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::DeployedFavorable => f.write_str("DEPLOYED_FAVORABLE"),
            PositionState::DeployedTactical { unfavorable_days } => {
                write!(f, "DEPLOYED_UNFAVORABLE_TACTICAL({unfavorable_days})")
            }
            PositionState::Retreated => f.write_str("RETREATED"),
            PositionState::AutoRetreated => f.write_str("AUTO_RETREATED"),
            PositionState::Captured => f.write_str("CAPTURED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CloseReason {
    Retreat,
    Timeout,
    Capture,
}

impl CloseReason {
    pub fn terminal_state(self) -> PositionState {
        match self {
            CloseReason::Retreat => PositionState::Retreated,
            CloseReason::Timeout => PositionState::AutoRetreated,
            CloseReason::Capture => PositionState::Captured,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Retreat => f.write_str("RETREAT"),
            CloseReason::Timeout => f.write_str("TIMEOUT"),
            CloseReason::Capture => f.write_str("CAPTURE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub ticker: String,
    pub piece: PieceId,
    pub kind: PieceKind,
    pub shares: u64,
    pub entry_price: f64,
    pub entry_day: usize,
    pub entry_date: NaiveDate,
    pub entry_zone: Zone,
    pub state: PositionState,
    /// Last day the tactical window was applied to this position.
    pub evaluated_day: usize,
}

impl Position {
    pub fn is_tactical(&self) -> bool {
        self.state.is_tactical()
    }

    pub fn cost_basis(&self) -> f64 {
        self.shares as f64 * self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.shares as f64 * (price - self.entry_price)
    }

    /// (price - entry) / entry * 100.
    pub fn gain_pct(&self, price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (price - self.entry_price) / self.entry_price * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ClosedPosition {
    pub ticker: String,
    pub kind: PieceKind,
    pub shares: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_day: usize,
    pub exit_day: usize,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub was_tactical: bool,
    pub reason: CloseReason,
    pub state: PositionState,
    pub pnl: f64,
}

impl ClosedPosition {
    pub fn gain_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.exit_price - self.entry_price) / self.entry_price * 100.0
    }
}
