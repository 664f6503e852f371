//! Trade journal records and lifecycle evaluation.
//!
//! "Now" and the mark price are always passed in; the evaluator never reads
//! a clock or a quote source.

use crate::domain::error::EngineError;
use crate::domain::numeric::round2;
use crate::domain::strategy::StrategyKind;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open => write!(f, "open"),
            TradeStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for TradeStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(TradeStatus::Open),
            "closed" => Ok(TradeStatus::Closed),
            other => Err(EngineError::invalid(format!("unknown trade status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    /// Negative for short positions.
    pub quantity: f64,
    pub status: TradeStatus,
    /// Return recorded by the store when the trade closed.
    pub return_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeEvaluation {
    pub symbol: String,
    pub status: TradeStatus,
    pub entry_date: NaiveDate,
    pub holding_days: i64,
    pub return_pct: Option<f64>,
    /// True when `return_pct` comes from a supplied mark price.
    pub marked_to_market: bool,
}

fn price_return(trade: &TradeRecord, price: f64) -> Result<f64, EngineError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(EngineError::invalid(format!(
            "{} trade: price must be positive, got {}",
            trade.symbol, price
        )));
    }
    let raw = (price - trade.entry_price) / trade.entry_price * 100.0;
    Ok(if trade.quantity < 0.0 { -raw } else { raw })
}

/// Holding period and return for one trade as of `now`.
///
/// Closed trades use their stored return, falling back to the exit price.
/// Open trades only get a return when `mark_price` is supplied.
pub fn evaluate(
    trade: &TradeRecord,
    now: NaiveDate,
    mark_price: Option<f64>,
) -> Result<TradeEvaluation, EngineError> {
    if !trade.entry_price.is_finite() || trade.entry_price <= 0.0 {
        return Err(EngineError::invalid(format!(
            "{} trade: entry price must be positive, got {}",
            trade.symbol, trade.entry_price
        )));
    }

    let (holding_days, return_pct, marked_to_market) = match trade.status {
        TradeStatus::Closed => {
            let exit_date = trade.exit_date.ok_or_else(|| {
                EngineError::invalid(format!("{} trade: closed without exit date", trade.symbol))
            })?;
            let days = (exit_date - trade.entry_date).num_days();
            if days < 0 {
                return Err(EngineError::invalid(format!(
                    "{} trade: exit {} precedes entry {}",
                    trade.symbol, exit_date, trade.entry_date
                )));
            }
            let ret = match (trade.return_pct, trade.exit_price) {
                (Some(stored), _) => stored,
                (None, Some(exit)) => price_return(trade, exit)?,
                (None, None) => {
                    return Err(EngineError::invalid(format!(
                        "{} trade: closed without return or exit price",
                        trade.symbol
                    )));
                }
            };
            (days, Some(round2(ret)), false)
        }
        TradeStatus::Open => {
            let days = (now - trade.entry_date).num_days();
            if days < 0 {
                return Err(EngineError::invalid(format!(
                    "{} trade: evaluation date {} precedes entry {}",
                    trade.symbol, now, trade.entry_date
                )));
            }
            match mark_price {
                Some(price) => (days, Some(round2(price_return(trade, price)?)), true),
                None => (days, None, false),
            }
        }
    };

    Ok(TradeEvaluation {
        symbol: trade.symbol.clone(),
        status: trade.status,
        entry_date: trade.entry_date,
        holding_days,
        return_pct,
        marked_to_market,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    Open,
    Closed,
    #[default]
    All,
}

impl StatusFilter {
    pub fn accepts(&self, status: TradeStatus) -> bool {
        match self {
            StatusFilter::Open => status == TradeStatus::Open,
            StatusFilter::Closed => status == TradeStatus::Closed,
            StatusFilter::All => true,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(StatusFilter::Open),
            "closed" => Ok(StatusFilter::Closed),
            "all" => Ok(StatusFilter::All),
            other => Err(EngineError::invalid(format!("unknown status filter '{}'", other))),
        }
    }
}

/// Trades passing `status`, newest entry first, then by symbol.
pub fn filter_trades(trades: Vec<TradeRecord>, status: StatusFilter) -> Vec<TradeRecord> {
    let mut kept: Vec<TradeRecord> = trades
        .into_iter()
        .filter(|t| status.accepts(t.status))
        .collect();
    kept.sort_by(|a, b| {
        b.entry_date
            .cmp(&a.entry_date)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    kept
}

/// Aggregate outcome of evaluated trades. Trades without a return count
/// toward `trades` and holding days only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalSummary {
    pub trades: usize,
    pub with_return: usize,
    pub won: usize,
    pub lost: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub avg_return_pct: f64,
    pub best_return_pct: Option<f64>,
    pub worst_return_pct: Option<f64>,
    pub avg_holding_days: f64,
}

impl JournalSummary {
    pub fn compute(evaluations: &[TradeEvaluation]) -> Self {
        let mut won = 0usize;
        let mut lost = 0usize;
        let mut breakeven = 0usize;
        let mut total_return = 0.0_f64;
        let mut best: Option<f64> = None;
        let mut worst: Option<f64> = None;
        let mut total_days = 0i64;

        for eval in evaluations {
            total_days += eval.holding_days;
            let Some(ret) = eval.return_pct else {
                continue;
            };
            if ret > 0.0 {
                won += 1;
            } else if ret < 0.0 {
                lost += 1;
            } else {
                breakeven += 1;
            }
            total_return += ret;
            best = Some(best.map_or(ret, |b| b.max(ret)));
            worst = Some(worst.map_or(ret, |w| w.min(ret)));
        }

        let with_return = won + lost + breakeven;
        let win_rate = if with_return > 0 {
            won as f64 / with_return as f64 * 100.0
        } else {
            0.0
        };
        let avg_return_pct = if with_return > 0 {
            total_return / with_return as f64
        } else {
            0.0
        };
        let avg_holding_days = if evaluations.is_empty() {
            0.0
        } else {
            total_days as f64 / evaluations.len() as f64
        };

        JournalSummary {
            trades: evaluations.len(),
            with_return,
            won,
            lost,
            breakeven,
            win_rate: round2(win_rate),
            avg_return_pct: round2(avg_return_pct),
            best_return_pct: best,
            worst_return_pct: worst,
            avg_holding_days: round2(avg_holding_days),
        }
    }
}
