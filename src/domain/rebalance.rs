//! Rebalance snapshots and period-over-period holding diffs.

use crate::domain::error::EngineError;
use crate::domain::strategy::StrategyKind;
use crate::ports::rebalance_port::RebalancePort;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_RECENT_DATES: usize = 5;

/// One stored `(strategy, date, symbol)` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceRow {
    pub strategy: StrategyKind,
    pub date: NaiveDate,
    pub symbol: String,
}

/// The set of symbols a strategy holds as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebalanceSnapshot {
    pub strategy: StrategyKind,
    pub date: NaiveDate,
    pub symbols: BTreeSet<String>,
}

/// Group raw rows into snapshots ordered by strategy, then date.
///
/// A symbol listed twice in one snapshot is rejected.
pub fn snapshots_from_rows(rows: &[RebalanceRow]) -> Result<Vec<RebalanceSnapshot>, EngineError> {
    let mut grouped: BTreeMap<(StrategyKind, NaiveDate), BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        let symbol = row.symbol.trim();
        if symbol.is_empty() {
            return Err(EngineError::invalid(format!(
                "{} rebalance on {}: empty symbol",
                row.strategy.store_key(),
                row.date
            )));
        }
        let symbols = grouped.entry((row.strategy, row.date)).or_default();
        if !symbols.insert(symbol.to_string()) {
            return Err(EngineError::invalid(format!(
                "{} rebalance on {}: duplicate symbol {}",
                row.strategy.store_key(),
                row.date,
                symbol
            )));
        }
    }

    Ok(grouped
        .into_iter()
        .map(|((strategy, date), symbols)| RebalanceSnapshot {
            strategy,
            date,
            symbols,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebalanceDiff {
    pub strategy: StrategyKind,
    pub date: NaiveDate,
    pub previous_date: Option<NaiveDate>,
    /// False when no snapshot exists for `date`; an empty portfolio on a
    /// real rebalance date is `present` with empty sets.
    pub present: bool,
    pub added: Vec<String>,
    pub held: Vec<String>,
    pub removed: Vec<String>,
}

impl RebalanceDiff {
    fn absent(strategy: StrategyKind, date: NaiveDate) -> Self {
        Self {
            strategy,
            date,
            previous_date: None,
            present: false,
            added: Vec::new(),
            held: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Partition `current` against `previous`. A missing current snapshot gives
/// an absent diff for `strategy` on `date`.
pub fn diff_snapshots(
    strategy: StrategyKind,
    date: NaiveDate,
    current: Option<&RebalanceSnapshot>,
    previous: Option<&RebalanceSnapshot>,
) -> RebalanceDiff {
    let Some(current) = current else {
        return RebalanceDiff::absent(strategy, date);
    };

    let empty = BTreeSet::new();
    let previous_symbols = previous.map_or(&empty, |p| &p.symbols);

    RebalanceDiff {
        strategy,
        date,
        previous_date: previous.map(|p| p.date),
        present: true,
        added: current
            .symbols
            .difference(previous_symbols)
            .cloned()
            .collect(),
        held: current
            .symbols
            .intersection(previous_symbols)
            .cloned()
            .collect(),
        removed: previous_symbols
            .difference(&current.symbols)
            .cloned()
            .collect(),
    }
}

/// Diff the snapshot at `date` against the most recent one before it.
pub fn diff(
    port: &dyn RebalancePort,
    strategy: StrategyKind,
    date: NaiveDate,
) -> Result<RebalanceDiff, EngineError> {
    let Some(current) = port.fetch_snapshot(strategy, date)? else {
        tracing::debug!(strategy = %strategy, %date, "no rebalance snapshot");
        return Ok(RebalanceDiff::absent(strategy, date));
    };
    let previous = port.fetch_previous_snapshot(strategy, date)?;
    if let Some(prev) = previous.as_ref().filter(|p| p.date >= date) {
        return Err(EngineError::unavailable(format!(
            "store returned previous snapshot {} not before {}",
            prev.date, date
        )));
    }
    Ok(diff_snapshots(
        strategy,
        date,
        Some(&current),
        previous.as_ref(),
    ))
}

/// Diff every strategy at `date`, in strategy id order.
pub fn diff_all(port: &dyn RebalancePort, date: NaiveDate) -> Result<Vec<RebalanceDiff>, EngineError> {
    StrategyKind::ALL
        .into_iter()
        .map(|strategy| diff(port, strategy, date))
        .collect()
}

/// The `limit` most recent distinct rebalance dates, newest first.
pub fn recent_dates(
    port: &dyn RebalancePort,
    strategy: StrategyKind,
    limit: usize,
) -> Result<Vec<NaiveDate>, EngineError> {
    let dates: BTreeSet<NaiveDate> = port.list_rebalance_dates(strategy)?.into_iter().collect();
    Ok(dates.into_iter().rev().take(limit).collect())
}
