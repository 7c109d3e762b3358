//! Historical replay: walk the loaded days, act on the ranked suggestions,
//! and summarize what happened.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::domain::engine::{Engine, PositionView};
use crate::domain::error::EngineError;
use crate::domain::event::LedgerEvent;
use crate::domain::piece::PieceKind;
use crate::domain::position::CloseReason;
use crate::domain::rules::shares_for;
use crate::domain::suggestion::{Suggestion, SuggestionKind};
use crate::ports::journal_port::JournalPort;

/// Units tried, in order, for a tactical entry.
const TACTICAL_KINDS: [PieceKind; 2] = [PieceKind::Pawn, PieceKind::Knight];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Open pawn/knight positions on unfavorable squares that otherwise
    /// pass the deployment threshold.
    pub tactical_entries: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        ReplayOptions {
            tactical_entries: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReplaySummary {
    pub start_day: usize,
    pub end_day: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_replayed: usize,
    pub opened: usize,
    pub tactical_opened: usize,
    pub advanced: usize,
    pub reclaimed: usize,
    pub retreats: usize,
    pub timeouts: usize,
    pub captures: usize,
    pub rejected: usize,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub open_positions: Vec<PositionView>,
}

impl ReplaySummary {
    pub fn closes(&self) -> usize {
        self.retreats + self.timeouts + self.captures
    }

    fn absorb(&mut self, event: &LedgerEvent) {
        match event {
            LedgerEvent::Opened { tactical, .. } => {
                self.opened += 1;
                if *tactical {
                    self.tactical_opened += 1;
                }
            }
            LedgerEvent::Closed(closed) => {
                match closed.reason {
                    CloseReason::Retreat => self.retreats += 1,
                    CloseReason::Timeout => self.timeouts += 1,
                    CloseReason::Capture => self.captures += 1,
                }
                self.realized_pnl += closed.pnl;
            }
            LedgerEvent::Advanced { .. } => self.advanced += 1,
            LedgerEvent::Reclaimed { .. } => self.reclaimed += 1,
        }
    }
}

/// Replays from the current day to the last loaded day. Positions still open
/// at the end stay open and are reported with their unrealized P&L.
pub fn run_replay(
    engine: &mut Engine,
    options: &ReplayOptions,
    mut journal: Option<&mut dyn JournalPort>,
) -> Result<ReplaySummary, EngineError> {
    if engine.day_count() == 0 {
        return Err(EngineError::data_range("no market data loaded"));
    }

    let mut summary = ReplaySummary {
        start_day: engine.current_day(),
        start_date: engine.current_date(),
        ..ReplaySummary::default()
    };

    loop {
        summary.rejected += act_on_suggestions(engine)?;
        if options.tactical_entries {
            summary.rejected += open_tactical_entries(engine)?;
        }
        summary.days_replayed += 1;

        if engine.is_last_day() {
            break;
        }
        engine.advance_day()?;
        drain(engine, &mut summary, &mut journal)?;
    }
    drain(engine, &mut summary, &mut journal)?;
    if let Some(j) = journal.as_deref_mut() {
        j.flush()?;
    }

    summary.end_day = engine.current_day();
    summary.end_date = engine.current_date();
    let state = engine.board_state(summary.end_day)?;
    summary.unrealized_pnl = state
        .positions
        .iter()
        .filter_map(|p| p.unrealized_pnl)
        .sum();
    summary.open_positions = state.positions;

    info!(
        days = summary.days_replayed,
        opened = summary.opened,
        closes = summary.closes(),
        realized_pnl = summary.realized_pnl,
        "replay finished"
    );
    Ok(summary)
}

fn drain(
    engine: &mut Engine,
    summary: &mut ReplaySummary,
    journal: &mut Option<&mut dyn JournalPort>,
) -> Result<(), EngineError> {
    let events = engine.take_events();
    for event in &events {
        summary.absorb(event);
    }
    if let Some(j) = journal.as_deref_mut() {
        j.record_all(&events)?;
    }
    Ok(())
}

/// Executes the best untried suggestion until none is left, re-ranking after
/// every action. Returns the number of rule rejections.
fn act_on_suggestions(engine: &mut Engine) -> Result<usize, EngineError> {
    let mut tried: HashSet<(SuggestionKind, String)> = HashSet::new();
    let mut rejected = 0;

    loop {
        let next = engine
            .ranked_suggestions()
            .into_iter()
            .find(|s| !tried.contains(&(s.kind, s.ticker.clone())));
        let Some(suggestion) = next else {
            return Ok(rejected);
        };
        tried.insert((suggestion.kind, suggestion.ticker.clone()));

        match execute(engine, &suggestion) {
            Ok(()) => {}
            Err(e) if e.is_rule_rejection() => {
                debug!(ticker = %suggestion.ticker, kind = %suggestion.kind, error = %e, "suggestion rejected");
                rejected += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn execute(engine: &mut Engine, suggestion: &Suggestion) -> Result<(), EngineError> {
    let ticker = suggestion.ticker.as_str();
    match (suggestion.kind, suggestion.piece) {
        (SuggestionKind::MandatoryRetreat, _) => engine.retreat(ticker).map(|_| ()),
        (SuggestionKind::Capture, _) => engine.capture(ticker).map(|_| ()),
        (SuggestionKind::Advancement, Some(target)) => engine.advance(ticker, target).map(|_| ()),
        (SuggestionKind::Deployment, Some(kind)) => engine.deploy(ticker, kind).map(|_| ()),
        (SuggestionKind::Advancement | SuggestionKind::Deployment, None) => Ok(()),
    }
}

fn open_tactical_entries(engine: &mut Engine) -> Result<usize, EngineError> {
    let min_score = engine.config().suggestions.deployment_min_score;
    let day = engine.current_day();
    let board = engine.day_board(day)?;

    let mut candidates: Vec<(f64, String, f64)> = board
        .snapshots
        .iter()
        .filter(|s| !engine.ledger().has_position(&s.ticker))
        .filter_map(|s| {
            let signal = s.signal?;
            let price = s.price?;
            let score = signal.components.score;
            (!signal.coordinate.zone.is_favorable() && score >= min_score)
                .then(|| (score, s.ticker.clone(), price))
        })
        .collect();
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut rejected = 0;
    for (_, ticker, price) in candidates {
        let kind = TACTICAL_KINDS.into_iter().find(|k| {
            engine
                .inventory()
                .peek(*k)
                .is_some_and(|p| shares_for(p.monetary_value, price) > 0)
        });
        let Some(kind) = kind else {
            continue;
        };
        match engine.deploy(&ticker, kind) {
            Ok(_) => {}
            Err(EngineError::TooManyPositions { .. }) => {
                rejected += 1;
                break;
            }
            Err(e) if e.is_rule_rejection() => rejected += 1,
            Err(e) => return Err(e),
        }
    }
    Ok(rejected)
}
