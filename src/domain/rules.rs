//! Position lifecycle rules.
//!
//! Deployment validation, the mandatory-retreat flag, the tactical reclaim
//! window and game phase classification. Nothing here mutates state; the
//! engine applies the outcomes.

use std::fmt;

use crate::domain::board::Zone;
use crate::domain::error::EngineError;
use crate::domain::inventory::{CAPITAL_EPSILON, PieceInventory};
use crate::domain::ledger::PositionLedger;
use crate::domain::piece::{PieceId, PieceKind, Tier};
use crate::domain::position::{Position, PositionState};
use crate::domain::snapshot::InstrumentSnapshot;

pub const DEFAULT_MAX_POSITIONS: usize = 8;
pub const DEFAULT_RECLAIM_WINDOW: u32 = 3;

/// Open positions at or below this count put the game in the opening.
pub const OPENING_MAX_POSITIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RuleLimits {
    pub max_positions: usize,
    pub reclaim_window: u32,
}

impl Default for RuleLimits {
    fn default() -> Self {
        RuleLimits {
            max_positions: DEFAULT_MAX_POSITIONS,
            reclaim_window: DEFAULT_RECLAIM_WINDOW,
        }
    }
}

/// Advisory findings that ride along with a successful action.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RuleWarning {
    TierRankMismatch {
        kind: PieceKind,
        rank: u8,
        expected: (u8, u8),
    },
}

impl fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleWarning::TierRankMismatch {
                kind,
                rank,
                expected: (lo, hi),
            } => write!(f, "{kind} belongs on ranks {lo}-{hi}, deployed on rank {rank}"),
        }
    }
}

/// Outcome of a successful deployment check.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPlan {
    pub piece: PieceId,
    pub kind: PieceKind,
    pub unit_value: f64,
    pub price: f64,
    pub shares: u64,
    pub zone: Zone,
    pub rank: u8,
    pub warnings: Vec<RuleWarning>,
}

impl DeploymentPlan {
    pub fn is_tactical(&self) -> bool {
        !self.zone.is_favorable()
    }
}

/// Checks a deployment of `kind` onto the instrument of `snapshot`.
///
/// Order: duplicate position, undefined score, unit availability, square
/// entry, position limit, capital.
pub fn validate_deployment(
    snapshot: &InstrumentSnapshot,
    kind: PieceKind,
    ledger: &PositionLedger,
    inventory: &PieceInventory,
    limits: &RuleLimits,
) -> Result<DeploymentPlan, EngineError> {
    let ticker = snapshot.ticker.as_str();
    if ledger.has_position(ticker) {
        return Err(EngineError::DuplicatePosition {
            ticker: ticker.to_string(),
        });
    }

    let (signal, price) = match (snapshot.signal, snapshot.price) {
        (Some(signal), Some(price)) => (signal, price),
        _ => {
            return Err(EngineError::data_range(format!(
                "score for {ticker} is undefined on this day"
            )));
        }
    };

    let piece = inventory
        .peek(kind)
        .ok_or(EngineError::PieceUnavailable { kind })?;

    let zone = signal.coordinate.zone;
    if !zone.is_favorable() && !kind.can_enter_unfavorable() {
        return Err(EngineError::InvalidSquareEntry {
            ticker: ticker.to_string(),
            kind,
        });
    }

    if ledger.open_count() + 1 > limits.max_positions {
        return Err(EngineError::TooManyPositions {
            max: limits.max_positions,
        });
    }

    let unit_value = piece.monetary_value;
    let shares = shares_for(unit_value, price);
    if shares == 0 {
        return Err(EngineError::InsufficientCapital {
            ticker: ticker.to_string(),
            required: price,
            available: unit_value,
        });
    }
    let available = inventory.available_capital();
    if available - unit_value < -CAPITAL_EPSILON {
        return Err(EngineError::InsufficientCapital {
            ticker: ticker.to_string(),
            required: unit_value,
            available,
        });
    }

    let rank = signal.coordinate.rank;
    let warnings = tier_rank_warning(kind, rank).into_iter().collect();

    Ok(DeploymentPlan {
        piece: piece.id,
        kind,
        unit_value,
        price,
        shares,
        zone,
        rank,
        warnings,
    })
}

/// Whole shares a unit of `unit_value` buys at `price`.
pub fn shares_for(unit_value: f64, price: f64) -> u64 {
    if price <= 0.0 || unit_value <= 0.0 {
        return 0;
    }
    (unit_value / price).floor() as u64
}

pub fn tier_rank_warning(kind: PieceKind, rank: u8) -> Option<RuleWarning> {
    let (lo, hi) = kind.tier().rank_band()?;
    if (lo..=hi).contains(&rank) {
        None
    } else {
        Some(RuleWarning::TierRankMismatch {
            kind,
            rank,
            expected: (lo, hi),
        })
    }
}

/// A favorable-opened position whose square turned unfavorable.
pub fn retreat_required(position: &Position, zone: Option<Zone>) -> bool {
    position.state == PositionState::DeployedFavorable && zone == Some(Zone::Unfavorable)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacticalStep {
    Reclaimed,
    Held { unfavorable_days: u32 },
    TimedOut,
}

/// One day-advance of a tactical position. A day without a defined zone
/// neither reclaims nor counts against the window.
pub fn tactical_step(unfavorable_days: u32, zone: Option<Zone>, reclaim_window: u32) -> TacticalStep {
    match zone {
        Some(Zone::Favorable) => TacticalStep::Reclaimed,
        Some(Zone::Unfavorable) if unfavorable_days >= reclaim_window => TacticalStep::TimedOut,
        Some(Zone::Unfavorable) => TacticalStep::Held {
            unfavorable_days: unfavorable_days + 1,
        },
        None => TacticalStep::Held { unfavorable_days },
    }
}

/// Checks promoting the pawn on `position` to a unit of `target`.
pub fn validate_advancement(
    position: &Position,
    snapshot: &InstrumentSnapshot,
    target: PieceKind,
    inventory: &PieceInventory,
) -> Result<PieceId, EngineError> {
    let ticker = position.ticker.as_str();
    if retreat_required(position, snapshot.zone()) {
        return Err(EngineError::RetreatRequired {
            ticker: ticker.to_string(),
        });
    }
    let invalid = |reason: &str| EngineError::InvalidAdvancement {
        ticker: ticker.to_string(),
        reason: reason.to_string(),
    };
    if position.kind != PieceKind::Pawn {
        return Err(invalid("only pawns can be advanced"));
    }
    if position.is_tactical() {
        return Err(invalid("tactical positions must reclaim a favorable square first"));
    }
    if target.tier() <= Tier::Tier1 {
        return Err(invalid("target must be a larger tier than the pawn"));
    }
    if snapshot.price.is_none() {
        return Err(EngineError::data_range(format!(
            "no price for {ticker} on this day"
        )));
    }
    inventory
        .peek(target)
        .map(|p| p.id)
        .ok_or(EngineError::PieceUnavailable { kind: target })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    /// Piece kinds a deployment suggestion prefers in this phase, before the
    /// tier matched to the square's rank.
    pub fn preferred_kinds(self) -> &'static [PieceKind] {
        match self {
            GamePhase::Opening => &[PieceKind::Pawn, PieceKind::Knight],
            GamePhase::Middlegame => &[PieceKind::Rook, PieceKind::Bishop, PieceKind::Queen],
            GamePhase::Endgame => &[],
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::Opening => f.write_str("OPENING"),
            GamePhase::Middlegame => f.write_str("MIDDLEGAME"),
            GamePhase::Endgame => f.write_str("ENDGAME"),
        }
    }
}

/// Endgame once any open position sits on rank 7-8; otherwise opening while
/// fewer than four positions are open.
pub fn classify_phase(open_ranks: &[Option<u8>]) -> GamePhase {
    if open_ranks.iter().flatten().any(|&r| r >= 7) {
        GamePhase::Endgame
    } else if open_ranks.len() <= OPENING_MAX_POSITIONS {
        GamePhase::Opening
    } else {
        GamePhase::Middlegame
    }
}

/// Kind a deployment suggestion should name for a favorable square at `rank`
/// and `price`: the phase's preference, then the rank's tier, then the
/// smallest affordable unit.
pub fn recommend_kind(
    phase: GamePhase,
    rank: u8,
    price: f64,
    inventory: &PieceInventory,
) -> Option<PieceKind> {
    let usable = |kind: &PieceKind| {
        inventory
            .peek(*kind)
            .is_some_and(|p| shares_for(p.monetary_value, price) > 0)
    };
    phase
        .preferred_kinds()
        .iter()
        .chain(Tier::for_rank(rank).kinds())
        .chain(PieceKind::DEPLOYABLE.iter())
        .copied()
        .find(|k| usable(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::board::{BoardCoordinate, BoardFile};
    use crate::domain::score::{RawSignals, ScoreComponents};
    use crate::domain::snapshot::TileSignal;
    use chrono::NaiveDate;

    fn snapshot(ticker: &str, price: f64, rank: u8, zone: Zone) -> InstrumentSnapshot {
        let components = ScoreComponents {
            momentum_norm: 0.5,
            volatility_norm: 0.5,
            liquidity_norm: 0.5,
            composite: 0.5,
            score: 0.5,
        };
        InstrumentSnapshot {
            ticker: ticker.to_string(),
            price: Some(price),
            signal: Some(TileSignal {
                moving_average: price,
                raw: RawSignals {
                    momentum: 0.0,
                    volatility: 0.01,
                    liquidity: 0.5,
                },
                components,
                coordinate: BoardCoordinate {
                    rank,
                    file: BoardFile::D,
                    zone,
                },
            }),
        }
    }

    fn open(ledger: &mut PositionLedger, inv: &mut PieceInventory, ticker: &str, kind: PieceKind) {
        let piece = inv.acquire(kind, ticker).unwrap();
        ledger
            .open(Position {
                ticker: ticker.to_string(),
                piece,
                kind,
                shares: 1,
                entry_price: 10.0,
                entry_day: 0,
                entry_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                entry_zone: Zone::Favorable,
                state: PositionState::DeployedFavorable,
                evaluated_day: 0,
            })
            .unwrap();
    }

    #[test]
    fn valid_deployment_plan() {
        let inv = PieceInventory::new(100_000.0, 0.30);
        let ledger = PositionLedger::new();
        let snap = snapshot("AAPL", 175.5, 5, Zone::Favorable);
        let plan =
            validate_deployment(&snap, PieceKind::Rook, &ledger, &inv, &RuleLimits::default())
                .unwrap();
        assert_eq!(plan.shares, (3846.153846 / 175.5f64).floor() as u64);
        assert!(plan.warnings.is_empty());
        assert!(!plan.is_tactical());
    }

    #[test]
    fn duplicate_checked_before_everything() {
        let mut inv = PieceInventory::new(100.0, 0.01);
        let mut ledger = PositionLedger::new();
        open(&mut ledger, &mut inv, "AAPL", PieceKind::Pawn);
        let snap = snapshot("AAPL", 1_000_000.0, 8, Zone::Unfavorable);
        let err = validate_deployment(&snap, PieceKind::Queen, &ledger, &inv, &RuleLimits::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicatePosition { .. }));
    }

    #[test]
    fn undefined_score_is_out_of_range() {
        let inv = PieceInventory::new(100_000.0, 0.30);
        let ledger = PositionLedger::new();
        let snap = InstrumentSnapshot {
            ticker: "NEW".into(),
            price: Some(10.0),
            signal: None,
        };
        let err = validate_deployment(&snap, PieceKind::Pawn, &ledger, &inv, &RuleLimits::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::DataRange { .. }));
    }

    #[test]
    fn unfavorable_square_admits_only_pawns_and_knights() {
        let inv = PieceInventory::new(100_000.0, 0.30);
        let ledger = PositionLedger::new();
        let snap = snapshot("MSFT", 50.0, 2, Zone::Unfavorable);
        for kind in [PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen] {
            let err = validate_deployment(&snap, kind, &ledger, &inv, &RuleLimits::default())
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidSquareEntry { .. }));
        }
        let plan = validate_deployment(&snap, PieceKind::Knight, &ledger, &inv, &RuleLimits::default())
            .unwrap();
        assert!(plan.is_tactical());
    }

    #[test]
    fn king_is_unavailable() {
        let inv = PieceInventory::new(100_000.0, 0.30);
        let ledger = PositionLedger::new();
        let snap = snapshot("MSFT", 50.0, 1, Zone::Favorable);
        let err = validate_deployment(&snap, PieceKind::King, &ledger, &inv, &RuleLimits::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::PieceUnavailable { kind: PieceKind::King }));
    }

    #[test]
    fn position_limit() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        let mut ledger = PositionLedger::new();
        open(&mut ledger, &mut inv, "A", PieceKind::Pawn);
        open(&mut ledger, &mut inv, "B", PieceKind::Pawn);
        let limits = RuleLimits {
            max_positions: 2,
            reclaim_window: 3,
        };
        let snap = snapshot("C", 10.0, 1, Zone::Favorable);
        let err = validate_deployment(&snap, PieceKind::Pawn, &ledger, &inv, &limits).unwrap_err();
        assert!(matches!(err, EngineError::TooManyPositions { max: 2 }));
    }

    #[test]
    fn unit_must_buy_one_share() {
        let inv = PieceInventory::new(100_000.0, 0.30);
        let ledger = PositionLedger::new();
        let snap = snapshot("BRK", 800.0, 1, Zone::Favorable);
        let err = validate_deployment(&snap, PieceKind::Pawn, &ledger, &inv, &RuleLimits::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientCapital { .. }));
    }

    #[test]
    fn tier_rank_mismatch_is_a_warning() {
        let inv = PieceInventory::new(100_000.0, 0.30);
        let ledger = PositionLedger::new();
        let snap = snapshot("AAPL", 100.0, 8, Zone::Favorable);
        let plan = validate_deployment(&snap, PieceKind::Pawn, &ledger, &inv, &RuleLimits::default())
            .unwrap();
        assert_eq!(
            plan.warnings,
            vec![RuleWarning::TierRankMismatch {
                kind: PieceKind::Pawn,
                rank: 8,
                expected: (1, 2)
            }]
        );
        assert_eq!(
            plan.warnings[0].to_string(),
            "PAWN belongs on ranks 1-2, deployed on rank 8"
        );
    }

    #[test]
    fn tactical_window() {
        assert_eq!(tactical_step(0, Some(Zone::Favorable), 3), TacticalStep::Reclaimed);
        assert_eq!(
            tactical_step(0, Some(Zone::Unfavorable), 3),
            TacticalStep::Held { unfavorable_days: 1 }
        );
        assert_eq!(
            tactical_step(2, Some(Zone::Unfavorable), 3),
            TacticalStep::Held { unfavorable_days: 3 }
        );
        assert_eq!(tactical_step(3, Some(Zone::Unfavorable), 3), TacticalStep::TimedOut);
        assert_eq!(tactical_step(2, Some(Zone::Favorable), 3), TacticalStep::Reclaimed);
        assert_eq!(tactical_step(2, None, 3), TacticalStep::Held { unfavorable_days: 2 });
    }

    #[test]
    fn retreat_flag_only_for_favorable_entries() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        let mut ledger = PositionLedger::new();
        open(&mut ledger, &mut inv, "A", PieceKind::Pawn);
        let mut pos = ledger.get("A").unwrap().clone();
        assert!(retreat_required(&pos, Some(Zone::Unfavorable)));
        assert!(!retreat_required(&pos, Some(Zone::Favorable)));
        assert!(!retreat_required(&pos, None));
        pos.state = PositionState::DeployedTactical { unfavorable_days: 1 };
        assert!(!retreat_required(&pos, Some(Zone::Unfavorable)));
    }

    #[test]
    fn advancement_checks() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        let mut ledger = PositionLedger::new();
        open(&mut ledger, &mut inv, "A", PieceKind::Pawn);
        open(&mut ledger, &mut inv, "B", PieceKind::Rook);
        let pawn = ledger.get("A").unwrap();
        let rook = ledger.get("B").unwrap();

        let fav = snapshot("A", 12.0, 5, Zone::Favorable);
        assert!(validate_advancement(pawn, &fav, PieceKind::Knight, &inv).is_ok());
        assert!(matches!(
            validate_advancement(pawn, &fav, PieceKind::Pawn, &inv),
            Err(EngineError::InvalidAdvancement { .. })
        ));
        assert!(matches!(
            validate_advancement(rook, &fav, PieceKind::Queen, &inv),
            Err(EngineError::InvalidAdvancement { .. })
        ));

        let unfav = snapshot("A", 9.0, 5, Zone::Unfavorable);
        assert!(matches!(
            validate_advancement(pawn, &unfav, PieceKind::Knight, &inv),
            Err(EngineError::RetreatRequired { .. })
        ));
    }

    #[test]
    fn phases() {
        assert_eq!(classify_phase(&[]), GamePhase::Opening);
        assert_eq!(classify_phase(&[Some(1), Some(2), Some(3)]), GamePhase::Opening);
        assert_eq!(
            classify_phase(&[Some(1), Some(2), Some(3), Some(4)]),
            GamePhase::Middlegame
        );
        assert_eq!(classify_phase(&[Some(7)]), GamePhase::Endgame);
        assert_eq!(classify_phase(&[None, Some(8)]), GamePhase::Endgame);
    }

    #[test]
    fn recommendations_follow_phase_then_rank() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        assert_eq!(
            recommend_kind(GamePhase::Opening, 6, 100.0, &inv),
            Some(PieceKind::Pawn)
        );
        assert_eq!(
            recommend_kind(GamePhase::Endgame, 6, 100.0, &inv),
            Some(PieceKind::Rook)
        );
        // pawns cannot afford one share at 1000, knights can
        assert_eq!(
            recommend_kind(GamePhase::Opening, 1, 1000.0, &inv),
            Some(PieceKind::Knight)
        );
        for t in ["A", "B"] {
            inv.acquire(PieceKind::Rook, t).unwrap();
        }
        assert_eq!(
            recommend_kind(GamePhase::Middlegame, 5, 100.0, &inv),
            Some(PieceKind::Bishop)
        );
    }
}
