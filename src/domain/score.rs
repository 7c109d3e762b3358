//! Strength score: momentum, volatility and liquidity signals blended into a
//! cross-sectional [0, 1] score per day.

use crate::domain::indicator::{return_volatility, simple_moving_average};

/// Neutral liquidity signal used until a real one is wired in.
pub const LIQUIDITY_PLACEHOLDER: f64 = 0.5;

pub const DEFAULT_STRESS_THRESHOLD: f64 = 20.0;

/// Weight moved from momentum to volatility on stressed days.
pub const STRESS_SHIFT: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScoreWeights {
    pub momentum: f64,
    pub volatility: f64,
    pub liquidity: f64,
}

impl ScoreWeights {
    pub const BASE: ScoreWeights = ScoreWeights {
        momentum: 0.60,
        volatility: 0.25,
        liquidity: 0.15,
    };

    pub fn stressed(self) -> Self {
        ScoreWeights {
            momentum: self.momentum - STRESS_SHIFT,
            volatility: self.volatility + STRESS_SHIFT,
            liquidity: self.liquidity,
        }
    }

    /// Base weights, shifted when the volatility index is strictly above
    /// `threshold`. A missing index value means no stress.
    pub fn for_index(volatility_index: Option<f64>, threshold: f64) -> Self {
        match volatility_index {
            Some(v) if v > threshold => Self::BASE.stressed(),
            _ => Self::BASE,
        }
    }

    pub fn sum(&self) -> f64 {
        self.momentum + self.volatility + self.liquidity
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RawSignals {
    pub momentum: f64,
    pub volatility: f64,
    pub liquidity: f64,
}

/// Per-instrument inputs for one day, before cross-sectional scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentSignals {
    pub price: f64,
    pub moving_average: f64,
    pub raw: RawSignals,
}

/// Signals for the day at `day`, or `None` while the trailing window is
/// incomplete.
pub fn compute_signals(
    closes: &[Option<f64>],
    returns: &[f64],
    day: usize,
    period: usize,
) -> Option<InstrumentSignals> {
    let moving_average = simple_moving_average(closes, day, period)?;
    let price = closes.get(day).copied().flatten()?;
    if moving_average <= 0.0 {
        return None;
    }
    let volatility = return_volatility(returns, day, period)?;
    Some(InstrumentSignals {
        price,
        moving_average,
        raw: RawSignals {
            momentum: (price - moving_average) / moving_average,
            volatility,
            liquidity: LIQUIDITY_PLACEHOLDER,
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScoreComponents {
    pub momentum_norm: f64,
    /// Inverted: the calmest instrument scores 1.
    pub volatility_norm: f64,
    pub liquidity_norm: f64,
    pub composite: f64,
    pub score: f64,
}

/// Min-max scaling to [0, 1]; a degenerate set maps to 0.5 everywhere.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= f64::EPSILON {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Scores one day across the universe. Instruments without signals are
/// skipped and keep `None`.
pub fn score_universe(
    signals: &[Option<RawSignals>],
    weights: ScoreWeights,
) -> Vec<Option<ScoreComponents>> {
    let defined: Vec<(usize, RawSignals)> = signals
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.map(|s| (i, s)))
        .collect();

    let mut out = vec![None; signals.len()];
    if defined.is_empty() {
        return out;
    }

    let momentum = min_max_normalize(&defined.iter().map(|(_, s)| s.momentum).collect::<Vec<_>>());
    let volatility: Vec<f64> =
        min_max_normalize(&defined.iter().map(|(_, s)| s.volatility).collect::<Vec<_>>())
            .into_iter()
            .map(|v| 1.0 - v)
            .collect();
    let liquidity =
        min_max_normalize(&defined.iter().map(|(_, s)| s.liquidity).collect::<Vec<_>>());

    let composite: Vec<f64> = (0..defined.len())
        .map(|k| {
            weights.momentum * momentum[k]
                + weights.volatility * volatility[k]
                + weights.liquidity * liquidity[k]
        })
        .collect();
    let scores = min_max_normalize(&composite);

    for (k, (idx, _)) in defined.iter().enumerate() {
        out[*idx] = Some(ScoreComponents {
            momentum_norm: momentum[k],
            volatility_norm: volatility[k],
            liquidity_norm: liquidity[k],
            composite: composite[k],
            score: scores[k].clamp(0.0, 1.0),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn raw(momentum: f64, volatility: f64) -> Option<RawSignals> {
        Some(RawSignals {
            momentum,
            volatility,
            liquidity: LIQUIDITY_PLACEHOLDER,
        })
    }

    #[test]
    fn weights_sum_to_one() {
        assert_abs_diff_eq!(ScoreWeights::BASE.sum(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ScoreWeights::BASE.stressed().sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn stress_only_above_threshold() {
        assert_eq!(ScoreWeights::for_index(None, 20.0), ScoreWeights::BASE);
        assert_eq!(ScoreWeights::for_index(Some(20.0), 20.0), ScoreWeights::BASE);
        let stressed = ScoreWeights::for_index(Some(27.5), 20.0);
        assert_abs_diff_eq!(stressed.momentum, 0.50, epsilon = 1e-12);
        assert_abs_diff_eq!(stressed.volatility, 0.35, epsilon = 1e-12);
        assert_abs_diff_eq!(stressed.liquidity, 0.15, epsilon = 1e-12);
    }

    #[test]
    fn normalize_degenerate_is_half() {
        assert_eq!(min_max_normalize(&[3.0, 3.0]), vec![0.5, 0.5]);
        assert_eq!(min_max_normalize(&[7.0]), vec![0.5]);
        assert_eq!(min_max_normalize(&[0.0, 5.0, 10.0]), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn undefined_instruments_are_excluded() {
        let out = score_universe(&[raw(0.05, 0.01), None, raw(-0.02, 0.03)], ScoreWeights::BASE);
        assert!(out[1].is_none());
        let best = out[0].unwrap();
        let worst = out[2].unwrap();
        assert_abs_diff_eq!(best.score, 1.0);
        assert_abs_diff_eq!(worst.score, 0.0);
        assert_abs_diff_eq!(best.volatility_norm, 1.0);
        assert_abs_diff_eq!(worst.volatility_norm, 0.0);
    }

    #[test]
    fn composite_uses_weights() {
        // momentum favors A, volatility favors B
        let out = score_universe(&[raw(0.10, 0.04), raw(0.00, 0.01)], ScoreWeights::BASE);
        let a = out[0].unwrap();
        let b = out[1].unwrap();
        assert_abs_diff_eq!(a.composite, 0.60 + 0.15 * 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(b.composite, 0.25 + 0.15 * 0.5, epsilon = 1e-12);
        assert!(a.score > b.score);
    }

    #[test]
    fn single_instrument_scores_half() {
        let out = score_universe(&[raw(0.2, 0.02)], ScoreWeights::BASE);
        assert_abs_diff_eq!(out[0].unwrap().score, 0.5);
    }

    #[test]
    fn signals_need_full_window() {
        let closes: Vec<Option<f64>> = [100.0, 101.0, 102.0, 103.0].into_iter().map(Some).collect();
        let returns = crate::domain::indicator::daily_returns(&closes);
        assert!(compute_signals(&closes, &returns, 1, 3).is_none());
        let s = compute_signals(&closes, &returns, 3, 3).unwrap();
        assert_abs_diff_eq!(s.moving_average, 102.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.raw.momentum, 1.0 / 102.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.raw.liquidity, LIQUIDITY_PLACEHOLDER);
    }
}
