//! Piece inventory and capital valuation.
//!
//! The inventory owns the 15 units of the catalog. Unit values are fixed at
//! construction: `point_value / 39 * momentum_capital`. The king stands for
//! the reserve (`total_capital - momentum_capital`) and is never assigned.

use crate::domain::error::EngineError;
use crate::domain::piece::{CATALOG, Piece, PieceId, PieceKind, TOTAL_POINTS, Tier};

/// Tolerance used for capital comparisons.
pub const CAPITAL_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InventoryRow {
    pub kind: PieceKind,
    pub count: usize,
    pub assigned: usize,
    pub unit_value: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone)]
pub struct PieceInventory {
    total_capital: f64,
    momentum_capital: f64,
    pieces: Vec<Piece>,
}

impl PieceInventory {
    pub fn new(total_capital: f64, risk_allocation: f64) -> Self {
        let momentum_capital = total_capital * risk_allocation;
        let multiplier = momentum_capital / TOTAL_POINTS as f64;
        let mut pieces = Vec::with_capacity(15);
        let mut next_id = 0u8;

        for (kind, qty) in CATALOG {
            for _ in 0..qty {
                let monetary_value = match kind {
                    PieceKind::King => total_capital - momentum_capital,
                    _ => kind.point_value() as f64 * multiplier,
                };
                pieces.push(Piece {
                    id: PieceId(next_id),
                    kind,
                    monetary_value,
                    bound_to: None,
                });
                next_id += 1;
            }
        }

        PieceInventory {
            total_capital,
            momentum_capital,
            pieces,
        }
    }

    pub fn total_capital(&self) -> f64 {
        self.total_capital
    }

    pub fn momentum_capital(&self) -> f64 {
        self.momentum_capital
    }

    /// Cash held back by the king; constant for the life of the inventory.
    pub fn reserve_cash(&self) -> f64 {
        self.total_capital - self.momentum_capital
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.0 as usize)
    }

    pub fn unit_value(&self, kind: PieceKind) -> f64 {
        self.pieces
            .iter()
            .find(|p| p.kind == kind)
            .map(|p| p.monetary_value)
            .unwrap_or(0.0)
    }

    /// Lowest-id unassigned unit of `kind`. The king is never offered.
    pub fn peek(&self, kind: PieceKind) -> Option<&Piece> {
        if kind == PieceKind::King {
            return None;
        }
        self.pieces
            .iter()
            .find(|p| p.kind == kind && !p.is_assigned())
    }

    /// Unassigned unit of the lowest point value within `tier`. On an
    /// unfavorable square only units that may enter one are offered.
    pub fn peek_tier(&self, tier: Tier, unfavorable: bool) -> Option<&Piece> {
        if tier == Tier::Reserve {
            return None;
        }
        self.pieces
            .iter()
            .filter(|p| p.tier() == tier && !p.is_assigned())
            .filter(|p| !unfavorable || p.kind.can_enter_unfavorable())
            .min_by_key(|p| (p.point_value(), p.id))
    }

    pub fn acquire(&mut self, kind: PieceKind, ticker: &str) -> Result<PieceId, EngineError> {
        let id = self
            .peek(kind)
            .map(|p| p.id)
            .ok_or(EngineError::PieceUnavailable { kind })?;
        self.bind(id, ticker);
        Ok(id)
    }

    fn bind(&mut self, id: PieceId, ticker: &str) {
        if let Some(piece) = self.pieces.get_mut(id.0 as usize) {
            piece.bound_to = Some(ticker.to_string());
        }
    }

    /// Returns the unit to the pool. Releasing an unassigned unit is a no-op.
    pub fn release(&mut self, id: PieceId) {
        if let Some(piece) = self.pieces.get_mut(id.0 as usize) {
            piece.bound_to = None;
        }
    }

    pub fn unassigned_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| p.kind != PieceKind::King && !p.is_assigned())
            .count()
    }

    pub fn has_unassigned_above(&self, tier: Tier) -> bool {
        self.pieces
            .iter()
            .any(|p| p.tier() > tier && !p.is_assigned())
    }

    pub fn deployed_value(&self) -> f64 {
        self.pieces
            .iter()
            .filter(|p| p.is_assigned())
            .map(|p| p.monetary_value)
            .sum()
    }

    /// Momentum capital not currently bound to a position.
    pub fn available_capital(&self) -> f64 {
        self.momentum_capital - self.deployed_value()
    }

    pub fn summary(&self) -> Vec<InventoryRow> {
        CATALOG
            .iter()
            .map(|&(kind, _)| {
                let of_kind: Vec<&Piece> = self.pieces.iter().filter(|p| p.kind == kind).collect();
                let unit_value = of_kind.first().map(|p| p.monetary_value).unwrap_or(0.0);
                InventoryRow {
                    kind,
                    count: of_kind.len(),
                    assigned: of_kind.iter().filter(|p| p.is_assigned()).count(),
                    unit_value,
                    total_value: of_kind.iter().map(|p| p.monetary_value).sum(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn moderate_allocation_values() {
        let inv = PieceInventory::new(100_000.0, 0.30);
        assert_abs_diff_eq!(inv.momentum_capital(), 30_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(inv.reserve_cash(), 70_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(inv.unit_value(PieceKind::Queen), 6923.08, epsilon = 0.005);
        assert_abs_diff_eq!(inv.unit_value(PieceKind::Pawn), 769.23, epsilon = 0.005);
        assert_abs_diff_eq!(inv.unit_value(PieceKind::King), 70_000.0, epsilon = 1e-9);
    }

    #[test]
    fn non_reserve_values_sum_to_momentum_capital() {
        for allocation in [0.0, 0.10, 0.25, 0.30, 0.50] {
            let inv = PieceInventory::new(250_000.0, allocation);
            let sum: f64 = inv
                .pieces()
                .iter()
                .filter(|p| p.kind != PieceKind::King)
                .map(|p| p.monetary_value)
                .sum();
            assert_abs_diff_eq!(sum, inv.momentum_capital(), epsilon = CAPITAL_EPSILON);
            assert_abs_diff_eq!(
                inv.reserve_cash() + inv.momentum_capital(),
                250_000.0,
                epsilon = CAPITAL_EPSILON
            );
        }
    }

    #[test]
    fn acquire_binds_and_release_frees() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        let id = inv.acquire(PieceKind::Rook, "AAPL").unwrap();
        let piece = inv.get(id).unwrap();
        assert_eq!(piece.kind, PieceKind::Rook);
        assert_eq!(piece.bound_to.as_deref(), Some("AAPL"));
        assert_eq!(inv.unassigned_count(), 13);

        inv.release(id);
        assert!(!inv.get(id).unwrap().is_assigned());
        assert_eq!(inv.unassigned_count(), 14);
    }

    #[test]
    fn acquire_exhausts_kind() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        inv.acquire(PieceKind::Queen, "A").unwrap();
        let err = inv.acquire(PieceKind::Queen, "B").unwrap_err();
        assert!(matches!(err, EngineError::PieceUnavailable { kind: PieceKind::Queen }));
    }

    #[test]
    fn king_is_never_acquired() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        assert!(inv.peek(PieceKind::King).is_none());
        assert!(inv.acquire(PieceKind::King, "A").is_err());
        assert!(inv.peek_tier(Tier::Reserve, false).is_none());
    }

    #[test]
    fn tier_lookup_prefers_lowest_id_on_equal_points() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        let first = inv.peek_tier(Tier::Tier2, false).unwrap().id;
        inv.acquire(PieceKind::Bishop, "A").unwrap();
        let second = inv.peek_tier(Tier::Tier2, false).unwrap().id;
        assert!(first < second);
        assert_eq!(inv.get(first).unwrap().tier(), Tier::Tier2);
        assert_eq!(inv.get(first).unwrap().kind, PieceKind::Bishop);
    }

    #[test]
    fn unfavorable_tier_lookup_offers_knights_only() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        assert_eq!(inv.peek_tier(Tier::Tier2, true).unwrap().kind, PieceKind::Knight);
        assert!(inv.peek_tier(Tier::Tier3, true).is_none());
        inv.acquire(PieceKind::Knight, "A").unwrap();
        inv.acquire(PieceKind::Knight, "B").unwrap();
        assert!(inv.peek_tier(Tier::Tier2, true).is_none());
        assert_eq!(inv.peek_tier(Tier::Tier2, false).unwrap().kind, PieceKind::Bishop);
    }

    #[test]
    fn available_capital_tracks_assignments() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        assert_abs_diff_eq!(inv.available_capital(), 30_000.0, epsilon = 1e-9);
        inv.acquire(PieceKind::Queen, "A").unwrap();
        assert_abs_diff_eq!(
            inv.available_capital(),
            30_000.0 - 9.0 / 39.0 * 30_000.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn larger_tier_availability() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        assert!(inv.has_unassigned_above(Tier::Tier1));
        inv.acquire(PieceKind::Queen, "A").unwrap();
        assert!(!inv.has_unassigned_above(Tier::Tier3));
        assert!(inv.has_unassigned_above(Tier::Tier2));
    }

    #[test]
    fn summary_rows() {
        let mut inv = PieceInventory::new(100_000.0, 0.30);
        inv.acquire(PieceKind::Pawn, "A").unwrap();
        let rows = inv.summary();
        assert_eq!(rows.len(), 6);
        let pawns = rows.iter().find(|r| r.kind == PieceKind::Pawn).unwrap();
        assert_eq!(pawns.count, 8);
        assert_eq!(pawns.assigned, 1);
        assert_abs_diff_eq!(pawns.total_value, 8.0 / 39.0 * 30_000.0, epsilon = 1e-9);
    }
}
