//! Ticker universe parsing.
//!
//! The universe is a comma-separated list of 1 to 10 symbols. Symbols are
//! trimmed and upper-cased; order is preserved.

use crate::domain::config::MAX_TICKERS;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),

    #[error("invalid ticker symbol: {0}")]
    InvalidSymbol(String),

    #[error("too many tickers: {count} (maximum {max})")]
    TooMany { count: usize, max: usize },
}

pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !ticker.chars().all(is_symbol_char) {
            return Err(UniverseError::InvalidSymbol(ticker));
        }
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    if tickers.len() > MAX_TICKERS {
        return Err(UniverseError::TooMany {
            count: tickers.len(),
            max: MAX_TICKERS,
        });
    }
    Ok(tickers)
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')
}
