//! Board coordinates: score → rank, quality → file, price vs average → zone.

use std::fmt;

pub const FILES: [BoardFile; 8] = [
    BoardFile::A,
    BoardFile::B,
    BoardFile::C,
    BoardFile::D,
    BoardFile::E,
    BoardFile::F,
    BoardFile::G,
    BoardFile::H,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum BoardFile {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl BoardFile {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }

    /// C-F: high-quality center files.
    pub fn is_center(self) -> bool {
        matches!(self, BoardFile::C | BoardFile::D | BoardFile::E | BoardFile::F)
    }
}

impl fmt::Display for BoardFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Favorable when price sits strictly above its moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Zone {
    Favorable,
    Unfavorable,
}

impl Zone {
    pub fn is_favorable(self) -> bool {
        self == Zone::Favorable
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Favorable => f.write_str("FAVORABLE"),
            Zone::Unfavorable => f.write_str("UNFAVORABLE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoardCoordinate {
    pub rank: u8,
    pub file: BoardFile,
    pub zone: Zone,
}

impl fmt::Display for BoardCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file, self.rank)
    }
}

/// rank = 1 + floor((1 - score) * 8), clamped to [1, 8].
pub fn rank_for_score(score: f64) -> u8 {
    let raw = 1.0 + ((1.0 - score) * 8.0).floor();
    raw.clamp(1.0, 8.0) as u8
}

/// file = FILES[floor(metric * 8)], index clamped to [0, 7].
pub fn file_for_metric(metric: f64) -> BoardFile {
    let idx = (metric * 8.0).floor().clamp(0.0, 7.0) as usize;
    FILES[idx]
}

/// Equality resolves to unfavorable.
pub fn zone_for(price: f64, moving_average: f64) -> Zone {
    if price > moving_average {
        Zone::Favorable
    } else {
        Zone::Unfavorable
    }
}

pub fn map_coordinate(
    score: f64,
    secondary: f64,
    price: f64,
    moving_average: f64,
) -> BoardCoordinate {
    BoardCoordinate {
        rank: rank_for_score(score),
        file: file_for_metric(secondary),
        zone: zone_for(price, moving_average),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_extremes() {
        assert_eq!(rank_for_score(1.0), 1);
        assert_eq!(rank_for_score(0.0), 8);
        assert_eq!(rank_for_score(0.5), 5);
        assert_eq!(rank_for_score(0.875), 2);
        assert_eq!(rank_for_score(0.95), 1);
    }

    #[test]
    fn rank_is_clamped_outside_unit_interval() {
        assert_eq!(rank_for_score(1.5), 1);
        assert_eq!(rank_for_score(-0.3), 8);
    }

    #[test]
    fn file_mapping() {
        assert_eq!(file_for_metric(0.0), BoardFile::A);
        assert_eq!(file_for_metric(0.124), BoardFile::A);
        assert_eq!(file_for_metric(0.125), BoardFile::B);
        assert_eq!(file_for_metric(0.5), BoardFile::E);
        assert_eq!(file_for_metric(0.999), BoardFile::H);
        assert_eq!(file_for_metric(1.0), BoardFile::H);
        assert_eq!(file_for_metric(-1.0), BoardFile::A);
    }

    #[test]
    fn center_and_flank_files() {
        assert!(BoardFile::C.is_center());
        assert!(BoardFile::F.is_center());
        assert!(!BoardFile::A.is_center());
        assert!(!BoardFile::H.is_center());
    }

    #[test]
    fn zone_above_average_is_favorable() {
        assert_eq!(zone_for(175.50, 172.30), Zone::Favorable);
    }

    #[test]
    fn zone_tie_is_unfavorable() {
        assert_eq!(zone_for(172.30, 172.30), Zone::Unfavorable);
        assert_eq!(zone_for(170.00, 172.30), Zone::Unfavorable);
    }

    #[test]
    fn coordinate_display() {
        let coord = map_coordinate(0.9, 0.3, 101.0, 100.0);
        assert_eq!(coord.rank, 1);
        assert_eq!(coord.file, BoardFile::C);
        assert_eq!(coord.zone, Zone::Favorable);
        assert_eq!(coord.to_string(), "C1");
    }
}
