//! The engine: one session's inventory, ledger and day cursor over a loaded
//! price history.
//!
//! Scores and board coordinates for every loaded day are computed once by
//! [`Engine::load_market_data`]. Every other call reads the cursor, which
//! only [`Engine::advance_day`] and [`Engine::rewind_day`] move.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::board::{BoardCoordinate, Zone};
use crate::domain::config::{ConfigSummary, EngineConfig};
use crate::domain::error::EngineError;
use crate::domain::event::LedgerEvent;
use crate::domain::inventory::{CAPITAL_EPSILON, PieceInventory};
use crate::domain::ledger::{ExitFill, PositionLedger};
use crate::domain::piece::{PieceKind, Tier};
use crate::domain::position::{CloseReason, ClosedPosition, Position, PositionState};
use crate::domain::price_series::{MarketPanel, PriceSeries};
use crate::domain::rules::{
    GamePhase, RuleWarning, TacticalStep, classify_phase, retreat_required, shares_for,
    tactical_step, validate_advancement, validate_deployment,
};
use crate::domain::score::ScoreWeights;
use crate::domain::snapshot::{DayBoard, InstrumentSnapshot, build_day_boards};
use crate::domain::suggestion::{RankingContext, Suggestion, rank_suggestions};
use crate::ports::data_port::MarketDataPort;

/// An open position as seen on a given day.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PositionView {
    pub position: Position,
    pub current_price: Option<f64>,
    pub gain_pct: Option<f64>,
    pub unrealized_pnl: Option<f64>,
    pub coordinate: Option<BoardCoordinate>,
    pub retreat_required: bool,
}

impl PositionView {
    fn new(position: &Position, snapshot: Option<&InstrumentSnapshot>) -> Self {
        let price = snapshot.and_then(|s| s.price);
        let coordinate = snapshot.and_then(|s| s.signal).map(|s| s.coordinate);
        PositionView {
            position: position.clone(),
            current_price: price,
            gain_pct: price.map(|p| position.gain_pct(p)),
            unrealized_pnl: price.map(|p| position.unrealized_pnl(p)),
            coordinate,
            retreat_required: retreat_required(position, coordinate.map(|c| c.zone)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoardState {
    pub day: usize,
    pub date: NaiveDate,
    pub volatility_index: Option<f64>,
    pub weights: ScoreWeights,
    pub tiles: Vec<InstrumentSnapshot>,
    pub positions: Vec<PositionView>,
    pub reserve_cash: f64,
    pub momentum_capital: f64,
    pub available_capital: f64,
    pub phase: GamePhase,
    pub undefined_tickers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Deployment {
    pub position: PositionView,
    pub warnings: Vec<RuleWarning>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    inventory: PieceInventory,
    ledger: PositionLedger,
    boards: Vec<DayBoard>,
    cursor: usize,
    events: Vec<LedgerEvent>,
}

impl Engine {
    pub fn initialize(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let inventory = PieceInventory::new(config.total_capital, config.risk_allocation);
        info!(
            tickers = config.tickers.len(),
            total_capital = config.total_capital,
            momentum_capital = inventory.momentum_capital(),
            ma_period = config.ma_period,
            "engine initialized"
        );
        Ok(Engine {
            config,
            inventory,
            ledger: PositionLedger::new(),
            boards: Vec::new(),
            cursor: 0,
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary::new(&self.config, &self.inventory)
    }

    pub fn inventory(&self) -> &PieceInventory {
        &self.inventory
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Loads closes for every ticker and scores every day. Returns the number
    /// of aligned days. The cursor moves to the first day with a complete
    /// moving-average window.
    ///
    /// A ticker whose fetch fails is kept with no prices so its tiles stay
    /// undefined.
    pub fn load_market_data(
        &mut self,
        source: &dyn MarketDataPort,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<usize, EngineError> {
        if start_date > end_date {
            return Err(EngineError::data_range(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }
        if self.ledger.open_count() > 0 {
            return Err(EngineError::validation(
                "market_data",
                "cannot reload while positions are open",
            ));
        }

        let mut series = Vec::with_capacity(self.config.tickers.len());
        for ticker in &self.config.tickers {
            let samples = match source.fetch_closes(ticker, start_date, end_date) {
                Ok(samples) => samples,
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "skipping ticker");
                    Vec::new()
                }
            };
            if samples.is_empty() {
                warn!(ticker = %ticker, "no closes in range");
            }
            series.push(PriceSeries::new(ticker.clone(), samples));
        }
        if series.iter().all(|s| s.is_empty()) {
            return Err(EngineError::data_range(format!(
                "no price data between {start_date} and {end_date}"
            )));
        }

        let volatility_index = source
            .fetch_volatility_index(start_date, end_date)
            .unwrap_or_else(|e| {
                warn!(error = %e, "volatility index unavailable, stress adjustment disabled");
                Vec::new()
            });

        let panel = MarketPanel::align(&series, &volatility_index);
        let period = self.config.ma_period;
        if panel.day_count() < period {
            return Err(EngineError::data_range(format!(
                "{} trading days loaded, moving average needs {period}",
                panel.day_count()
            )));
        }

        self.boards = build_day_boards(&panel, period, self.config.stress_threshold);
        self.cursor = self.first_usable_day();
        info!(
            days = self.boards.len(),
            first_usable_day = self.cursor,
            "market data loaded"
        );
        Ok(self.boards.len())
    }

    pub fn day_count(&self) -> usize {
        self.boards.len()
    }

    pub fn first_usable_day(&self) -> usize {
        self.config.ma_period.saturating_sub(1)
    }

    pub fn current_day(&self) -> usize {
        self.cursor
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.boards.get(self.cursor).map(|b| b.date)
    }

    pub fn is_last_day(&self) -> bool {
        self.cursor + 1 >= self.boards.len()
    }

    /// Index of the first loaded day on or after `date`.
    pub fn day_for_date(&self, date: NaiveDate) -> Result<usize, EngineError> {
        self.boards
            .iter()
            .position(|b| b.date >= date)
            .ok_or_else(|| EngineError::data_range(format!("no loaded day on or after {date}")))
    }

    pub fn day_board(&self, day: usize) -> Result<&DayBoard, EngineError> {
        if self.boards.is_empty() {
            return Err(EngineError::data_range("no market data loaded"));
        }
        self.boards.get(day).ok_or_else(|| {
            EngineError::data_range(format!(
                "day {day} outside loaded range 0..{}",
                self.boards.len()
            ))
        })
    }

    fn current_board(&self) -> Result<&DayBoard, EngineError> {
        self.day_board(self.cursor)
    }

    pub fn phase(&self) -> GamePhase {
        let board = self.boards.get(self.cursor);
        let ranks: Vec<Option<u8>> = self
            .ledger
            .positions()
            .map(|p| board.and_then(|b| b.snapshot(&p.ticker)).and_then(|s| s.rank()))
            .collect();
        classify_phase(&ranks)
    }

    pub fn board_state(&self, day: usize) -> Result<BoardState, EngineError> {
        let board = self.day_board(day)?;
        let positions: Vec<PositionView> = self
            .ledger
            .positions()
            .filter(|p| p.entry_day <= day)
            .map(|p| PositionView::new(p, board.snapshot(&p.ticker)))
            .collect();
        let ranks: Vec<Option<u8>> = positions
            .iter()
            .map(|v| v.coordinate.map(|c| c.rank))
            .collect();

        Ok(BoardState {
            day,
            date: board.date,
            volatility_index: board.volatility_index,
            weights: board.weights,
            tiles: board.snapshots.clone(),
            positions,
            reserve_cash: self.inventory.reserve_cash(),
            momentum_capital: self.inventory.momentum_capital(),
            available_capital: self.inventory.available_capital(),
            phase: classify_phase(&ranks),
            undefined_tickers: board.undefined_tickers(),
        })
    }

    pub fn position(&self, ticker: &str) -> Option<PositionView> {
        let board = self.boards.get(self.cursor);
        self.ledger
            .get(ticker)
            .map(|p| PositionView::new(p, board.and_then(|b| b.snapshot(ticker))))
    }

    /// Every candidate for the current day, ranked.
    pub fn ranked_suggestions(&self) -> Vec<Suggestion> {
        let Some(board) = self.boards.get(self.cursor) else {
            return Vec::new();
        };
        let ctx = RankingContext {
            board,
            ledger: &self.ledger,
            inventory: &self.inventory,
            limits: &self.config.limits,
            phase: self.phase(),
        };
        rank_suggestions(&ctx, &self.config.suggestions)
    }

    /// The top `top_n` ranked suggestions.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        let mut ranked = self.ranked_suggestions();
        ranked.truncate(self.config.suggestions.top_n);
        ranked
    }

    pub fn deploy(&mut self, ticker: &str, kind: PieceKind) -> Result<Deployment, EngineError> {
        if !self.config.tickers.iter().any(|t| t == ticker) {
            return Err(EngineError::UnknownTicker {
                ticker: ticker.to_string(),
            });
        }
        let day = self.cursor;
        let board = self.current_board()?;
        let snapshot = board
            .snapshot(ticker)
            .ok_or_else(|| EngineError::UnknownTicker {
                ticker: ticker.to_string(),
            })?
            .clone();
        let date = board.date;
        let plan = validate_deployment(
            &snapshot,
            kind,
            &self.ledger,
            &self.inventory,
            &self.config.limits,
        )?;

        let piece = self.inventory.acquire(kind, ticker)?;
        let tactical = plan.is_tactical();
        let state = if tactical {
            PositionState::DeployedTactical { unfavorable_days: 0 }
        } else {
            PositionState::DeployedFavorable
        };
        let position = Position {
            ticker: ticker.to_string(),
            piece,
            kind,
            shares: plan.shares,
            entry_price: plan.price,
            entry_day: day,
            entry_date: date,
            entry_zone: plan.zone,
            state,
            evaluated_day: day,
        };
        if let Err(e) = self.ledger.open(position) {
            self.inventory.release(piece);
            return Err(e);
        }

        info!(
            ticker,
            kind = %kind,
            shares = plan.shares,
            price = plan.price,
            rank = plan.rank,
            tactical,
            "position opened"
        );
        for warning in &plan.warnings {
            warn!(ticker, %warning, "rule warning");
        }
        self.events.push(LedgerEvent::Opened {
            ticker: ticker.to_string(),
            kind,
            shares: plan.shares,
            price: plan.price,
            day,
            date,
            tactical,
        });

        let view = self.position(ticker).ok_or_else(|| EngineError::NoPosition {
            ticker: ticker.to_string(),
        })?;
        Ok(Deployment {
            position: view,
            warnings: plan.warnings,
        })
    }

    /// Deploys the cheapest free unit of `tier`. On an unfavorable square
    /// only a unit that may enter one is chosen, so Tier2 resolves to a
    /// knight there.
    pub fn deploy_tier(&mut self, ticker: &str, tier: Tier) -> Result<Deployment, EngineError> {
        let unfavorable = self
            .current_board()?
            .snapshot(ticker)
            .and_then(|s| s.zone())
            == Some(Zone::Unfavorable);
        let kind = match self.inventory.peek_tier(tier, unfavorable) {
            Some(piece) => piece.kind,
            // let `deploy` report the rejection for the tier's own kind
            None => {
                let kinds = tier.kinds();
                kinds
                    .iter()
                    .copied()
                    .find(|k| !unfavorable || k.can_enter_unfavorable())
                    .unwrap_or(kinds[0])
            }
        };
        self.deploy(ticker, kind)
    }

    pub fn retreat(&mut self, ticker: &str) -> Result<ClosedPosition, EngineError> {
        self.close_position(ticker, CloseReason::Retreat)
    }

    pub fn capture(&mut self, ticker: &str) -> Result<ClosedPosition, EngineError> {
        self.close_position(ticker, CloseReason::Capture)
    }

    fn close_position(
        &mut self,
        ticker: &str,
        reason: CloseReason,
    ) -> Result<ClosedPosition, EngineError> {
        if !self.ledger.has_position(ticker) {
            return Err(EngineError::NoPosition {
                ticker: ticker.to_string(),
            });
        }
        let fill = exit_fill(self.current_board()?, ticker)?;
        let closed = self
            .ledger
            .close(ticker, reason, fill, &mut self.inventory)?;
        info!(
            ticker,
            reason = %reason,
            exit_price = closed.exit_price,
            pnl = closed.pnl,
            "position closed"
        );
        self.events.push(LedgerEvent::Closed(closed.clone()));
        Ok(closed)
    }

    /// Promotes the pawn on `ticker` to a unit of `target`.
    ///
    /// The share count never shrinks; the entry price becomes the average
    /// cost of the old and added shares.
    pub fn advance(&mut self, ticker: &str, target: PieceKind) -> Result<PositionView, EngineError> {
        let position = self
            .ledger
            .get(ticker)
            .ok_or_else(|| EngineError::NoPosition {
                ticker: ticker.to_string(),
            })?
            .clone();
        let day = self.cursor;
        let board = self.current_board()?;
        let date = board.date;
        let snapshot = board
            .snapshot(ticker)
            .ok_or_else(|| EngineError::UnknownTicker {
                ticker: ticker.to_string(),
            })?
            .clone();
        let new_piece = validate_advancement(&position, &snapshot, target, &self.inventory)?;
        let price = snapshot
            .price
            .ok_or_else(|| EngineError::data_range(format!("no price for {ticker} on day {day}")))?;

        let old_value = self
            .inventory
            .get(position.piece)
            .map(|p| p.monetary_value)
            .unwrap_or(0.0);
        let new_value = self
            .inventory
            .get(new_piece)
            .map(|p| p.monetary_value)
            .unwrap_or(0.0);
        let available = self.inventory.available_capital() + old_value;
        if available - new_value < -CAPITAL_EPSILON {
            return Err(EngineError::InsufficientCapital {
                ticker: ticker.to_string(),
                required: new_value,
                available,
            });
        }

        let shares = position.shares.max(shares_for(new_value, price));
        let added = shares - position.shares;
        let entry_price =
            (position.cost_basis() + added as f64 * price) / shares as f64;

        let piece = self.inventory.acquire(target, ticker)?;
        self.inventory.release(position.piece);
        if let Some(open) = self.ledger.get_mut(ticker) {
            open.piece = piece;
            open.kind = target;
            open.shares = shares;
            open.entry_price = entry_price;
        }

        info!(ticker, from = %position.kind, to = %target, shares, price, "pawn advanced");
        self.events.push(LedgerEvent::Advanced {
            ticker: ticker.to_string(),
            from: position.kind,
            to: target,
            shares,
            price,
            day,
            date,
        });
        self.position(ticker).ok_or_else(|| EngineError::NoPosition {
            ticker: ticker.to_string(),
        })
    }

    /// Moves the cursor forward one day and applies the tactical reclaim
    /// window to every tactical position not yet evaluated for that day.
    /// The cursor only moves once the window has been applied.
    pub fn advance_day(&mut self) -> Result<usize, EngineError> {
        if self.boards.is_empty() {
            return Err(EngineError::data_range("no market data loaded"));
        }
        if self.is_last_day() {
            return Err(EngineError::data_range(format!(
                "already at the last loaded day ({})",
                self.cursor
            )));
        }
        let next = self.cursor + 1;
        self.apply_tactical_window(next)?;
        self.cursor = next;
        Ok(self.cursor)
    }

    /// Moves the cursor back one day. Lifecycle transitions already applied
    /// are not undone.
    pub fn rewind_day(&mut self) -> Result<usize, EngineError> {
        if self.boards.is_empty() {
            return Err(EngineError::data_range("no market data loaded"));
        }
        if self.cursor <= self.first_usable_day() {
            return Err(EngineError::data_range(format!(
                "already at the first usable day ({})",
                self.cursor
            )));
        }
        self.cursor -= 1;
        Ok(self.cursor)
    }

    fn apply_tactical_window(&mut self, day: usize) -> Result<(), EngineError> {
        let board = self.day_board(day)?;
        let window = self.config.limits.reclaim_window;
        let date = board.date;

        // every fill is resolved before the ledger changes
        let mut steps = Vec::new();
        for position in self.ledger.positions().filter(|p| p.evaluated_day < day) {
            let PositionState::DeployedTactical { unfavorable_days } = position.state else {
                continue;
            };
            let snapshot = board.snapshot(&position.ticker);
            let step = tactical_step(unfavorable_days, snapshot.and_then(|s| s.zone()), window);
            let fill = match step {
                TacticalStep::TimedOut => Some(exit_fill(board, &position.ticker)?),
                _ => None,
            };
            let price = snapshot.and_then(|s| s.price);
            steps.push((position.ticker.clone(), step, fill, price));
        }

        for (ticker, step, fill, price) in steps {
            match (step, fill) {
                (TacticalStep::Reclaimed, _) => {
                    let Some(position) = self.ledger.get_mut(&ticker) else {
                        continue;
                    };
                    position.state = PositionState::DeployedFavorable;
                    info!(ticker = %ticker, day, "tactical position reclaimed favorable square");
                    self.events.push(LedgerEvent::Reclaimed {
                        ticker: ticker.clone(),
                        kind: position.kind,
                        price,
                        day,
                        date,
                    });
                }
                (TacticalStep::Held { unfavorable_days }, _) => {
                    if let Some(position) = self.ledger.get_mut(&ticker) {
                        position.state = PositionState::DeployedTactical { unfavorable_days };
                    }
                    debug!(ticker = %ticker, unfavorable_days, "tactical position held");
                }
                (TacticalStep::TimedOut, Some(fill)) => {
                    let closed = self.ledger.close(
                        &ticker,
                        CloseReason::Timeout,
                        fill,
                        &mut self.inventory,
                    )?;
                    info!(ticker = %ticker, pnl = closed.pnl, "tactical position auto-retreated");
                    self.events.push(LedgerEvent::Closed(closed));
                }
                (TacticalStep::TimedOut, None) => {}
            }
        }

        for position in self.ledger.positions_mut() {
            position.evaluated_day = position.evaluated_day.max(day);
        }
        Ok(())
    }

    /// Drains the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}

fn exit_fill(board: &DayBoard, ticker: &str) -> Result<ExitFill, EngineError> {
    let price = board
        .snapshot(ticker)
        .and_then(|s| s.price)
        .ok_or_else(|| {
            EngineError::data_range(format!("no price for {ticker} on day {}", board.day))
        })?;
    Ok(ExitFill {
        price,
        day: board.day,
        date: board.date,
    })
}
