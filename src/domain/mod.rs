//! Core domain types and logic.

pub mod error;
pub mod piece;
pub mod inventory;
pub mod board;
pub mod price_series;
pub mod indicator;
pub mod score;
pub mod snapshot;
pub mod position;
pub mod ledger;
pub mod rules;
pub mod suggestion;
pub mod event;
pub mod config;
pub mod config_validation;
pub mod universe;
pub mod engine;
pub mod replay;
