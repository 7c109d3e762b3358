//! Domain error types.

use crate::domain::piece::PieceKind;

/// Top-level error type for chesstrader.
///
/// Every failure in the engine is returned as one of these variants; none of
/// them leaves the engine in a partially mutated state.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("out of range: {reason}")]
    DataRange { reason: String },

    #[error("unknown ticker {ticker}")]
    UnknownTicker { ticker: String },

    #[error("insufficient capital for {ticker}: need {required:.2}, have {available:.2}")]
    InsufficientCapital {
        ticker: String,
        required: f64,
        available: f64,
    },

    #[error("no unassigned {kind} available")]
    PieceUnavailable { kind: PieceKind },

    #[error("position limit reached ({max} open)")]
    TooManyPositions { max: usize },

    #[error("position already open for {ticker}")]
    DuplicatePosition { ticker: String },

    #[error("{kind} cannot enter the unfavorable square of {ticker}")]
    InvalidSquareEntry { ticker: String, kind: PieceKind },

    #[error("no open position for {ticker}")]
    NoPosition { ticker: String },

    #[error("{ticker} is flagged for mandatory retreat")]
    RetreatRequired { ticker: String },

    #[error("cannot advance {ticker}: {reason}")]
    InvalidAdvancement { ticker: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data_range(reason: impl Into<String>) -> Self {
        EngineError::DataRange {
            reason: reason.into(),
        }
    }

    /// Deployment-time rejections: recoverable, the caller may pick another
    /// piece or instrument.
    pub fn is_rule_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientCapital { .. }
                | EngineError::PieceUnavailable { .. }
                | EngineError::TooManyPositions { .. }
                | EngineError::DuplicatePosition { .. }
                | EngineError::InvalidSquareEntry { .. }
                | EngineError::NoPosition { .. }
                | EngineError::RetreatRequired { .. }
                | EngineError::InvalidAdvancement { .. }
        )
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::Validation { .. }
            | EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Data { .. } => 3,
            EngineError::UnknownTicker { .. }
            | EngineError::InsufficientCapital { .. }
            | EngineError::PieceUnavailable { .. }
            | EngineError::TooManyPositions { .. }
            | EngineError::DuplicatePosition { .. }
            | EngineError::InvalidSquareEntry { .. }
            | EngineError::NoPosition { .. }
            | EngineError::RetreatRequired { .. }
            | EngineError::InvalidAdvancement { .. } => 4,
            EngineError::DataRange { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_instrument() {
        let err = EngineError::DuplicatePosition {
            ticker: "AAPL".into(),
        };
        assert_eq!(err.to_string(), "position already open for AAPL");

        let err = EngineError::InvalidSquareEntry {
            ticker: "MSFT".into(),
            kind: PieceKind::Rook,
        };
        assert_eq!(
            err.to_string(),
            "ROOK cannot enter the unfavorable square of MSFT"
        );
    }

    #[test]
    fn insufficient_capital_formats_amounts() {
        let err = EngineError::InsufficientCapital {
            ticker: "TSLA".into(),
            required: 769.2307,
            available: 12.5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient capital for TSLA: need 769.23, have 12.50"
        );
    }

    #[test]
    fn rule_rejections_are_classified() {
        assert!(EngineError::TooManyPositions { max: 8 }.is_rule_rejection());
        assert!(
            EngineError::NoPosition {
                ticker: "X".into()
            }
            .is_rule_rejection()
        );
        assert!(!EngineError::data_range("day 99").is_rule_rejection());
        assert!(!EngineError::validation("ma_period", "bad").is_rule_rejection());
    }
}
