//! Suggestion ranking.
//!
//! Candidates, in rule order:
//!
//! | Kind              | Trigger                                        | Priority            |
//! |-------------------|------------------------------------------------|---------------------|
//! | MANDATORY_RETREAT | favorable entry now on an unfavorable square   | 100                 |
//! | CAPTURE           | rank >= 7, gain >= capture threshold           | 70 + min(30, gain)  |
//! | ADVANCEMENT       | pawn, rank >= 5, favorable, gain >= threshold  | 60 + min(20, gain)  |
//! | DEPLOYMENT        | no position, favorable, score >= threshold     | score * 100         |
//!
//! Ordered by priority desc, score desc, ticker asc, then kind.

use std::cmp::Ordering;
use std::fmt;

use crate::domain::error::EngineError;
use crate::domain::inventory::{CAPITAL_EPSILON, PieceInventory};
use crate::domain::ledger::PositionLedger;
use crate::domain::piece::{PieceKind, Tier};
use crate::domain::position::PositionState;
use crate::domain::rules::{GamePhase, RuleLimits, recommend_kind, retreat_required};
use crate::domain::snapshot::DayBoard;

pub const RETREAT_PRIORITY: f64 = 100.0;
pub const CAPTURE_BASE: f64 = 70.0;
pub const CAPTURE_BONUS_CAP: f64 = 30.0;
pub const ADVANCEMENT_BASE: f64 = 60.0;
pub const ADVANCEMENT_BONUS_CAP: f64 = 20.0;
pub const CAPTURE_MIN_RANK: u8 = 7;
pub const ADVANCEMENT_MIN_RANK: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SuggestionKind {
    MandatoryRetreat,
    Capture,
    Advancement,
    Deployment,
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionKind::MandatoryRetreat => f.write_str("MANDATORY_RETREAT"),
            SuggestionKind::Capture => f.write_str("CAPTURE"),
            SuggestionKind::Advancement => f.write_str("ADVANCEMENT"),
            SuggestionKind::Deployment => f.write_str("DEPLOYMENT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub ticker: String,
    /// Unit to deploy, or the advancement target.
    pub piece: Option<PieceKind>,
    pub priority: f64,
    pub score: f64,
    pub gain_pct: Option<f64>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SuggestionConfig {
    pub capture_gain_pct: f64,
    pub advancement_gain_pct: f64,
    pub deployment_min_score: f64,
    pub top_n: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        SuggestionConfig {
            capture_gain_pct: 10.0,
            advancement_gain_pct: 5.0,
            deployment_min_score: 0.6,
            top_n: 3,
        }
    }
}

impl SuggestionConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.capture_gain_pct.is_finite() || self.capture_gain_pct < 0.0 {
            return Err(EngineError::validation(
                "capture_gain_pct",
                "must be a non-negative percentage",
            ));
        }
        if !self.advancement_gain_pct.is_finite() || self.advancement_gain_pct < 0.0 {
            return Err(EngineError::validation(
                "advancement_gain_pct",
                "must be a non-negative percentage",
            ));
        }
        if !(0.0..=1.0).contains(&self.deployment_min_score) {
            return Err(EngineError::validation(
                "deployment_min_score",
                "must be between 0 and 1",
            ));
        }
        if self.top_n == 0 {
            return Err(EngineError::validation("top_n", "must be at least 1"));
        }
        Ok(())
    }
}

/// Everything the ranker reads for one day.
pub struct RankingContext<'a> {
    pub board: &'a DayBoard,
    pub ledger: &'a PositionLedger,
    pub inventory: &'a PieceInventory,
    pub limits: &'a RuleLimits,
    pub phase: GamePhase,
}

/// All candidates for the day, sorted.
pub fn rank_suggestions(ctx: &RankingContext<'_>, config: &SuggestionConfig) -> Vec<Suggestion> {
    let mut out = Vec::new();
    position_candidates(ctx, config, &mut out);
    deployment_candidates(ctx, config, &mut out);
    out.sort_by(compare);
    out
}

pub fn compare(a: &Suggestion, b: &Suggestion) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.ticker.cmp(&b.ticker))
        .then_with(|| a.kind.cmp(&b.kind))
}

fn position_candidates(ctx: &RankingContext<'_>, config: &SuggestionConfig, out: &mut Vec<Suggestion>) {
    for position in ctx.ledger.positions() {
        let Some(snapshot) = ctx.board.snapshot(&position.ticker) else {
            continue;
        };
        let (Some(price), Some(signal)) = (snapshot.price, snapshot.signal) else {
            continue;
        };
        let coordinate = signal.coordinate;
        let score = signal.components.score;
        let gain = position.gain_pct(price);

        if retreat_required(position, Some(coordinate.zone)) {
            out.push(Suggestion {
                kind: SuggestionKind::MandatoryRetreat,
                ticker: position.ticker.clone(),
                piece: Some(position.kind),
                priority: RETREAT_PRIORITY,
                score,
                gain_pct: Some(gain),
                reason: format!(
                    "MANDATORY_RETREAT: {} on {} fell below its moving average ({:.2} <= {:.2})",
                    position.ticker, coordinate, price, signal.moving_average
                ),
            });
            continue;
        }

        if coordinate.rank >= CAPTURE_MIN_RANK && gain >= config.capture_gain_pct {
            out.push(Suggestion {
                kind: SuggestionKind::Capture,
                ticker: position.ticker.clone(),
                piece: Some(position.kind),
                priority: CAPTURE_BASE + gain.min(CAPTURE_BONUS_CAP),
                score,
                gain_pct: Some(gain),
                reason: format!(
                    "CAPTURE: {} on rank {} up {:.2}% (threshold {:.2}%)",
                    position.ticker, coordinate.rank, gain, config.capture_gain_pct
                ),
            });
        }

        if position.kind == PieceKind::Pawn
            && position.state == PositionState::DeployedFavorable
            && coordinate.rank >= ADVANCEMENT_MIN_RANK
            && coordinate.zone.is_favorable()
            && gain >= config.advancement_gain_pct
            && ctx.inventory.has_unassigned_above(Tier::Tier1)
        {
            let target = advancement_target(coordinate.rank, ctx.inventory);
            out.push(Suggestion {
                kind: SuggestionKind::Advancement,
                ticker: position.ticker.clone(),
                piece: target,
                priority: ADVANCEMENT_BASE + gain.min(ADVANCEMENT_BONUS_CAP),
                score,
                gain_pct: Some(gain),
                reason: format!(
                    "ADVANCEMENT: pawn on {} {} up {:.2}% (threshold {:.2}%), promote{}",
                    position.ticker,
                    coordinate,
                    gain,
                    config.advancement_gain_pct,
                    target.map(|k| format!(" to {k}")).unwrap_or_default()
                ),
            });
        }
    }
}

/// Larger unit for a promotion: the tier matched to the rank if free,
/// otherwise the smallest free unit above the pawn.
fn advancement_target(rank: u8, inventory: &PieceInventory) -> Option<PieceKind> {
    Tier::for_rank(rank)
        .kinds()
        .iter()
        .chain([PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen].iter())
        .copied()
        .find(|k| k.tier() > Tier::Tier1 && inventory.peek(*k).is_some())
}

fn deployment_candidates(
    ctx: &RankingContext<'_>,
    config: &SuggestionConfig,
    out: &mut Vec<Suggestion>,
) {
    if ctx.inventory.unassigned_count() == 0
        || ctx.inventory.available_capital() <= CAPITAL_EPSILON
        || ctx.ledger.open_count() >= ctx.limits.max_positions
    {
        return;
    }

    for snapshot in &ctx.board.snapshots {
        if ctx.ledger.has_position(&snapshot.ticker) {
            continue;
        }
        let (Some(price), Some(signal)) = (snapshot.price, snapshot.signal) else {
            continue;
        };
        let score = signal.components.score;
        if !signal.coordinate.zone.is_favorable() || score < config.deployment_min_score {
            continue;
        }
        let Some(kind) = recommend_kind(ctx.phase, signal.coordinate.rank, price, ctx.inventory)
        else {
            continue;
        };
        out.push(Suggestion {
            kind: SuggestionKind::Deployment,
            ticker: snapshot.ticker.clone(),
            piece: Some(kind),
            priority: score * 100.0,
            score,
            gain_pct: None,
            reason: format!(
                "DEPLOYMENT: {} on {} favorable, score {:.2} >= {:.2}; {} suggests {}",
                snapshot.ticker,
                signal.coordinate,
                score,
                config.deployment_min_score,
                ctx.phase,
                kind
            ),
        });
    }
}
