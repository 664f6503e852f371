//! Report rendering port trait.

use crate::domain::error::EngineError;
use crate::domain::metrics::PortfolioMetrics;
use crate::domain::momentum::SkippedSymbol;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::ranking::RankedScore;
use crate::domain::rebalance::RebalanceDiff;
use crate::domain::strategy::StrategyKind;
use crate::domain::timeframe::BarSummary;
use crate::domain::trade::{JournalSummary, TradeEvaluation};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

/// Stored bar range for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolRange {
    pub symbol: String,
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub bars: usize,
}

/// Everything the CLI can print.
#[derive(Debug, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report<'a> {
    Ranking {
        strategy: StrategyKind,
        rows: &'a [RankedScore],
        skipped: &'a [SkippedSymbol],
    },
    Metrics {
        strategy: StrategyKind,
        metrics: &'a PortfolioMetrics,
    },
    Diffs {
        diffs: &'a [RebalanceDiff],
    },
    Dates {
        strategy: StrategyKind,
        dates: &'a [NaiveDate],
    },
    Trades {
        strategy: StrategyKind,
        as_of: NaiveDate,
        trades: &'a [TradeEvaluation],
        summary: &'a JournalSummary,
    },
    Bars {
        symbol: &'a str,
        timeframe: String,
        bars: &'a [OhlcvBar],
        latest: Option<&'a BarSummary>,
    },
    Info {
        symbols: &'a [SymbolRange],
    },
}

/// Port for rendering reports.
pub trait ReportPort {
    fn render(&self, report: &Report<'_>) -> Result<String, EngineError>;

    /// Default implementation: renders then writes the text with a trailing
    /// newline.
    fn write(&self, report: &Report<'_>, out: &mut dyn Write) -> Result<(), EngineError> {
        let text = self.render(report)?;
        writeln!(out, "{}", text)?;
        Ok(())
    }
}
