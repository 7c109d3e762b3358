//! Capital units ("pieces") and their tiers.

use std::fmt;
use std::str::FromStr;

/// Point total of the non-reserve catalog (1×9 + 2×5 + 2×3 + 2×3 + 8×1).
pub const TOTAL_POINTS: u32 = 39;

/// Catalog layout in id order: kind and quantity.
pub const CATALOG: [(PieceKind, usize); 6] = [
    (PieceKind::King, 1),
    (PieceKind::Queen, 1),
    (PieceKind::Rook, 2),
    (PieceKind::Bishop, 2),
    (PieceKind::Knight, 2),
    (PieceKind::Pawn, 8),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

/// Allocation tier; ordered from reserve to the largest deployable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Tier {
    Reserve,
    Tier1,
    Tier2,
    Tier3,
    Tier4,
}

impl PieceKind {
    pub const DEPLOYABLE: [PieceKind; 5] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
    ];

    pub fn point_value(self) -> u32 {
        match self {
            PieceKind::King => 0,
            PieceKind::Pawn => 1,
            PieceKind::Knight | PieceKind::Bishop => 3,
            PieceKind::Rook => 5,
            PieceKind::Queen => 9,
        }
    }

    pub fn tier(self) -> Tier {
        match self {
            PieceKind::King => Tier::Reserve,
            PieceKind::Pawn => Tier::Tier1,
            PieceKind::Knight | PieceKind::Bishop => Tier::Tier2,
            PieceKind::Rook => Tier::Tier3,
            PieceKind::Queen => Tier::Tier4,
        }
    }

    /// Only pawns and knights may open on an unfavorable square.
    pub fn can_enter_unfavorable(self) -> bool {
        matches!(self, PieceKind::Pawn | PieceKind::Knight)
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceKind::King => "KING",
            PieceKind::Queen => "QUEEN",
            PieceKind::Rook => "ROOK",
            PieceKind::Bishop => "BISHOP",
            PieceKind::Knight => "KNIGHT",
            PieceKind::Pawn => "PAWN",
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PieceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KING" => Ok(PieceKind::King),
            "QUEEN" => Ok(PieceKind::Queen),
            "ROOK" => Ok(PieceKind::Rook),
            "BISHOP" => Ok(PieceKind::Bishop),
            "KNIGHT" => Ok(PieceKind::Knight),
            "PAWN" => Ok(PieceKind::Pawn),
            other => Err(format!("unknown piece kind: {other}")),
        }
    }
}

impl Tier {
    /// Board ranks this tier is matched to. The reserve has no band.
    pub fn rank_band(self) -> Option<(u8, u8)> {
        match self {
            Tier::Reserve => None,
            Tier::Tier1 => Some((1, 2)),
            Tier::Tier2 => Some((3, 4)),
            Tier::Tier3 => Some((5, 6)),
            Tier::Tier4 => Some((7, 8)),
        }
    }

    pub fn for_rank(rank: u8) -> Tier {
        match rank {
            0..=2 => Tier::Tier1,
            3..=4 => Tier::Tier2,
            5..=6 => Tier::Tier3,
            _ => Tier::Tier4,
        }
    }

    pub fn kinds(self) -> &'static [PieceKind] {
        match self {
            Tier::Reserve => &[PieceKind::King],
            Tier::Tier1 => &[PieceKind::Pawn],
            Tier::Tier2 => &[PieceKind::Knight, PieceKind::Bishop],
            Tier::Tier3 => &[PieceKind::Rook],
            Tier::Tier4 => &[PieceKind::Queen],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PieceId(pub u8);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One capital unit of the fixed catalog.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Piece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub monetary_value: f64,
    pub bound_to: Option<String>,
}

impl Piece {
    pub fn point_value(&self) -> u32 {
        self.kind.point_value()
    }

    pub fn tier(&self) -> Tier {
        self.kind.tier()
    }

    pub fn is_assigned(&self) -> bool {
        self.bound_to.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_points_sum_to_total() {
        let points: u32 = CATALOG
            .iter()
            .map(|(kind, qty)| kind.point_value() * *qty as u32)
            .sum();
        assert_eq!(points, TOTAL_POINTS);
        let units: usize = CATALOG.iter().map(|(_, qty)| qty).sum();
        assert_eq!(units, 15);
    }

    #[test]
    fn tiers_follow_point_values() {
        assert_eq!(PieceKind::King.tier(), Tier::Reserve);
        assert_eq!(PieceKind::Pawn.tier(), Tier::Tier1);
        assert_eq!(PieceKind::Knight.tier(), Tier::Tier2);
        assert_eq!(PieceKind::Bishop.tier(), Tier::Tier2);
        assert_eq!(PieceKind::Rook.tier(), Tier::Tier3);
        assert_eq!(PieceKind::Queen.tier(), Tier::Tier4);
        assert!(Tier::Tier4 > Tier::Tier1);
    }

    #[test]
    fn only_pawns_and_knights_enter_unfavorable() {
        let allowed: Vec<_> = PieceKind::DEPLOYABLE
            .iter()
            .filter(|k| k.can_enter_unfavorable())
            .collect();
        assert_eq!(allowed, vec![&PieceKind::Pawn, &PieceKind::Knight]);
    }

    #[test]
    fn rank_bands() {
        assert_eq!(Tier::for_rank(1), Tier::Tier1);
        assert_eq!(Tier::for_rank(2), Tier::Tier1);
        assert_eq!(Tier::for_rank(3), Tier::Tier2);
        assert_eq!(Tier::for_rank(6), Tier::Tier3);
        assert_eq!(Tier::for_rank(8), Tier::Tier4);
        assert_eq!(Tier::Tier3.rank_band(), Some((5, 6)));
        assert_eq!(Tier::Reserve.rank_band(), None);
    }

    #[test]
    fn parse_kind() {
        assert_eq!("queen".parse::<PieceKind>(), Ok(PieceKind::Queen));
        assert_eq!(" Knight ".parse::<PieceKind>(), Ok(PieceKind::Knight));
        assert!("castle".parse::<PieceKind>().is_err());
        assert_eq!(PieceKind::Bishop.to_string(), "BISHOP");
    }
}
