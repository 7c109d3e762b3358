//! Engine setup parameters and their validation.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::EngineError;
use crate::domain::inventory::{InventoryRow, PieceInventory};
use crate::domain::rules::RuleLimits;
use crate::domain::score::DEFAULT_STRESS_THRESHOLD;
use crate::domain::suggestion::SuggestionConfig;

pub const MAX_TICKERS: usize = 10;
pub const MAX_RISK_ALLOCATION: f64 = 0.5;
pub const MA_PERIODS: [usize; 5] = [10, 20, 50, 100, 200];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn allocation(self) -> f64 {
        match self {
            RiskLevel::Low => 0.10,
            RiskLevel::Moderate => 0.30,
            RiskLevel::High => 0.50,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("LOW"),
            RiskLevel::Moderate => f.write_str("MODERATE"),
            RiskLevel::High => f.write_str("HIGH"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "moderate" | "medium" => Ok(RiskLevel::Moderate),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub tickers: Vec<String>,
    pub total_capital: f64,
    pub risk_allocation: f64,
    pub ma_period: usize,
    pub limits: RuleLimits,
    pub stress_threshold: f64,
    pub suggestions: SuggestionConfig,
}

impl EngineConfig {
    /// Config with default limits, thresholds and suggestion settings.
    pub fn new(
        tickers: Vec<String>,
        total_capital: f64,
        risk_allocation: f64,
        ma_period: usize,
    ) -> Self {
        EngineConfig {
            tickers,
            total_capital,
            risk_allocation,
            ma_period,
            limits: RuleLimits::default(),
            stress_threshold: DEFAULT_STRESS_THRESHOLD,
            suggestions: SuggestionConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tickers.is_empty() || self.tickers.len() > MAX_TICKERS {
            return Err(EngineError::validation(
                "tickers",
                format!("expected 1 to {MAX_TICKERS} symbols, got {}", self.tickers.len()),
            ));
        }
        let mut seen = HashSet::new();
        for ticker in &self.tickers {
            if ticker.trim().is_empty() {
                return Err(EngineError::validation("tickers", "empty symbol"));
            }
            if !seen.insert(ticker.as_str()) {
                return Err(EngineError::validation(
                    "tickers",
                    format!("duplicate symbol {ticker}"),
                ));
            }
        }
        if !self.total_capital.is_finite() || self.total_capital <= 0.0 {
            return Err(EngineError::validation(
                "total_capital",
                "must be a positive amount",
            ));
        }
        if !(0.0..=MAX_RISK_ALLOCATION).contains(&self.risk_allocation) {
            return Err(EngineError::validation(
                "risk_allocation",
                format!("must be between 0 and {MAX_RISK_ALLOCATION}"),
            ));
        }
        if !MA_PERIODS.contains(&self.ma_period) {
            return Err(EngineError::validation(
                "ma_period",
                format!("must be one of {MA_PERIODS:?}"),
            ));
        }
        if self.limits.max_positions == 0 {
            return Err(EngineError::validation(
                "max_positions",
                "must be at least 1",
            ));
        }
        if !self.stress_threshold.is_finite() {
            return Err(EngineError::validation(
                "stress_threshold",
                "must be a finite number",
            ));
        }
        self.suggestions.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConfigSummary {
    pub tickers: Vec<String>,
    pub total_capital: f64,
    pub risk_allocation: f64,
    pub momentum_capital: f64,
    pub reserve_cash: f64,
    pub ma_period: usize,
    pub max_positions: usize,
    pub reclaim_window: u32,
    pub inventory: Vec<InventoryRow>,
}

impl ConfigSummary {
    pub fn new(config: &EngineConfig, inventory: &PieceInventory) -> Self {
        ConfigSummary {
            tickers: config.tickers.clone(),
            total_capital: inventory.total_capital(),
            risk_allocation: config.risk_allocation,
            momentum_capital: inventory.momentum_capital(),
            reserve_cash: inventory.reserve_cash(),
            ma_period: config.ma_period,
            max_positions: config.limits.max_positions,
            reclaim_window: config.limits.reclaim_window,
            inventory: inventory.summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> EngineConfig {
        EngineConfig::new(
            vec!["AAPL".into(), "MSFT".into()],
            100_000.0,
            RiskLevel::Moderate.allocation(),
            50,
        )
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn ticker_count_bounds() {
        let mut config = valid();
        config.tickers.clear();
        assert!(config.validate().is_err());
        config.tickers = (0..11).map(|i| format!("T{i}")).collect();
        assert!(config.validate().is_err());
        config.tickers.truncate(10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn duplicate_ticker_rejected() {
        let mut config = valid();
        config.tickers.push("AAPL".into());
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid tickers: duplicate symbol AAPL");
    }

    #[test]
    fn capital_and_allocation_ranges() {
        let mut config = valid();
        config.total_capital = 0.0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.risk_allocation = 0.51;
        assert!(config.validate().is_err());
        config.risk_allocation = 0.5;
        assert!(config.validate().is_ok());
        config.risk_allocation = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ma_period_must_be_listed() {
        let mut config = valid();
        config.ma_period = 30;
        assert!(matches!(
            config.validate(),
            Err(EngineError::Validation { ref field, .. }) if field == "ma_period"
        ));
        for period in MA_PERIODS {
            config.ma_period = period;
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn risk_levels() {
        assert_eq!("LOW".parse::<RiskLevel>(), Ok(RiskLevel::Low));
        assert_eq!("moderate".parse::<RiskLevel>(), Ok(RiskLevel::Moderate));
        assert_eq!(RiskLevel::High.allocation(), 0.50);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }
}
