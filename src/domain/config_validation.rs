//! Configuration loading and validation.
//!
//! Reads the `[engine]`, `[data]`, `[suggestions]` and `[replay]` sections
//! through a [`ConfigPort`]. Format problems surface as `ConfigMissing` /
//! `ConfigInvalid`; range checks are left to [`EngineConfig::validate`].

use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::config::{EngineConfig, RiskLevel};
use crate::domain::error::EngineError;
use crate::domain::replay::ReplayOptions;
use crate::domain::rules::{DEFAULT_MAX_POSITIONS, DEFAULT_RECLAIM_WINDOW, RuleLimits};
use crate::domain::score::DEFAULT_STRESS_THRESHOLD;
use crate::domain::suggestion::SuggestionConfig;
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_MA_PERIOD: usize = 50;
pub const DEFAULT_DATA_PATH: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: PathBuf,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub volatility_index: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySettings {
    pub options: ReplayOptions,
    pub journal: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub engine: EngineConfig,
    pub data: DataSettings,
    pub replay: ReplaySettings,
}

pub fn load_session_config(config: &dyn ConfigPort) -> Result<SessionConfig, EngineError> {
    let engine = build_engine_config(config)?;
    engine.validate()?;
    Ok(SessionConfig {
        engine,
        data: build_data_settings(config)?,
        replay: build_replay_settings(config),
    })
}

pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, EngineError> {
    let raw_tickers = config.require_string("engine", "tickers")?;
    let tickers = parse_tickers(&raw_tickers).map_err(|e| invalid("engine", "tickers", e.to_string()))?;
    let total_capital: f64 = parse_required(config, "engine", "total_capital")?;
    let risk_allocation = risk_allocation(config)?;
    let ma_period = parse_or(config, "engine", "ma_period", DEFAULT_MA_PERIOD)?;

    let limits = RuleLimits {
        max_positions: parse_or(config, "engine", "max_positions", DEFAULT_MAX_POSITIONS)?,
        reclaim_window: parse_or(config, "engine", "reclaim_window", DEFAULT_RECLAIM_WINDOW)?,
    };
    let stress_threshold =
        parse_or(config, "engine", "stress_threshold", DEFAULT_STRESS_THRESHOLD)?;

    Ok(EngineConfig {
        tickers,
        total_capital,
        risk_allocation,
        ma_period,
        limits,
        stress_threshold,
        suggestions: build_suggestion_config(config)?,
    })
}

/// A direct `risk_allocation` wins over `risk_level`.
fn risk_allocation(config: &dyn ConfigPort) -> Result<f64, EngineError> {
    if config.has_key("engine", "risk_allocation") {
        return parse_required(config, "engine", "risk_allocation");
    }
    let level = match config.get_string("engine", "risk_level") {
        Some(s) => s
            .parse::<RiskLevel>()
            .map_err(|e| invalid("engine", "risk_level", e))?,
        None => RiskLevel::Moderate,
    };
    Ok(level.allocation())
}

pub fn build_suggestion_config(config: &dyn ConfigPort) -> Result<SuggestionConfig, EngineError> {
    let defaults = SuggestionConfig::default();
    Ok(SuggestionConfig {
        capture_gain_pct: parse_or(
            config,
            "suggestions",
            "capture_gain_pct",
            defaults.capture_gain_pct,
        )?,
        advancement_gain_pct: parse_or(
            config,
            "suggestions",
            "advancement_gain_pct",
            defaults.advancement_gain_pct,
        )?,
        deployment_min_score: parse_or(
            config,
            "suggestions",
            "deployment_min_score",
            defaults.deployment_min_score,
        )?,
        top_n: parse_or(config, "suggestions", "top_n", defaults.top_n)?,
    })
}

pub fn build_data_settings(config: &dyn ConfigPort) -> Result<DataSettings, EngineError> {
    let path = config
        .get_string("data", "path")
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string());
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    let volatility_index = config
        .get_string("data", "volatility_index")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(DataSettings {
        path: PathBuf::from(path.trim()),
        start_date,
        end_date,
        volatility_index,
    })
}

pub fn build_replay_settings(config: &dyn ConfigPort) -> ReplaySettings {
    let defaults = ReplayOptions::default();
    ReplaySettings {
        options: ReplayOptions {
            tactical_entries: config.get_bool(
                "replay",
                "tactical_entries",
                defaults.tactical_entries,
            ),
        },
        journal: config
            .get_string("replay", "journal")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from),
    }
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, EngineError> {
    let value = config.require_string("data", key)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
        invalid(
            "data",
            key,
            format!("invalid {key} format, expected YYYY-MM-DD"),
        )
    })
}

fn parse_required<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<T, EngineError> {
    let value = config.require_string(section, key)?;
    value
        .parse()
        .map_err(|_| invalid(section, key, format!("cannot parse '{value}'")))
}

fn parse_or<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, EngineError> {
    match config.get_string(section, key) {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", v.trim()))),
        _ => Ok(default),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
