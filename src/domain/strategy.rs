//! Scoring strategy kinds.
//!
//! The four strategies form a closed set. Each has a numeric id, a short CLI
//! key, a display label and the key the store uses in rebalance, portfolio
//! and trade journal rows. Parsing accepts any of those spellings.

use crate::domain::error::EngineError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    CloseBased,
    TrueRange,
    Combined,
    PhysicsMv,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::CloseBased,
        StrategyKind::TrueRange,
        StrategyKind::Combined,
        StrategyKind::PhysicsMv,
    ];

    pub fn id(&self) -> u8 {
        match self {
            StrategyKind::CloseBased => 1,
            StrategyKind::TrueRange => 2,
            StrategyKind::Combined => 3,
            StrategyKind::PhysicsMv => 4,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            StrategyKind::CloseBased => "close",
            StrategyKind::TrueRange => "tr",
            StrategyKind::Combined => "comb",
            StrategyKind::PhysicsMv => "mv",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::CloseBased => "Close Based",
            StrategyKind::TrueRange => "True Range",
            StrategyKind::Combined => "Combined",
            StrategyKind::PhysicsMv => "P1-MV",
        }
    }

    pub fn store_key(&self) -> &'static str {
        match self {
            StrategyKind::CloseBased => "Close-Based",
            StrategyKind::TrueRange => "True-Range",
            StrategyKind::Combined => "Combined",
            StrategyKind::PhysicsMv => "P1-MV",
        }
    }

    /// Whether scores are range-normalized into 0..=100.
    pub fn is_normalized(&self) -> bool {
        !matches!(self, StrategyKind::PhysicsMv)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for StrategyKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        StrategyKind::ALL
            .into_iter()
            .find(|kind| {
                needle == kind.key()
                    || needle == kind.id().to_string()
                    || needle == kind.label().to_lowercase()
                    || needle == kind.store_key().to_lowercase()
            })
            .ok_or_else(|| EngineError::invalid(format!("unknown strategy kind '{}'", s.trim())))
    }
}

impl Serialize for StrategyKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.store_key())
    }
}
