//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod filter;
pub mod filter_parser;
pub mod metrics;
pub mod momentum;
pub mod numeric;
pub mod ohlcv;
pub mod ranking;
pub mod rebalance;
pub mod series;
pub mod strategy;
pub mod timeframe;
pub mod trade;
