#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use momentum_ranker::domain::error::EngineError;
use momentum_ranker::domain::metrics::PortfolioValuePoint;
pub use momentum_ranker::domain::ohlcv::OhlcvBar;
use momentum_ranker::domain::rebalance::RebalanceSnapshot;
use momentum_ranker::domain::strategy::StrategyKind;
use momentum_ranker::domain::trade::{StatusFilter, TradeRecord, TradeStatus};
use momentum_ranker::ports::{DataPort, PortfolioPort, RebalancePort, TradePort};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// In-memory store serving every read port.
#[derive(Default)]
pub struct MockStore {
    pub data: BTreeMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub snapshots: Vec<RebalanceSnapshot>,
    pub values: Vec<(StrategyKind, PortfolioValuePoint)>,
    pub trades: Vec<TradeRecord>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    /// Listed by `list_symbols`, but every fetch fails as unavailable.
    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.data.entry(symbol.to_string()).or_default();
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_snapshot(mut self, strategy: StrategyKind, day: NaiveDate, symbols: &[&str]) -> Self {
        self.snapshots.push(RebalanceSnapshot {
            strategy,
            date: day,
            symbols: symbols.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        });
        self
    }

    pub fn with_values(mut self, strategy: StrategyKind, points: &[(NaiveDate, f64)]) -> Self {
        self.values.extend(
            points
                .iter()
                .map(|(day, value)| (strategy, PortfolioValuePoint { date: *day, value: *value })),
        );
        self
    }

    pub fn with_trade(mut self, trade: TradeRecord) -> Self {
        self.trades.push(trade);
        self
    }

    fn check(&self, symbol: &str) -> Result<(), EngineError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(EngineError::unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl DataPort for MockStore {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, EngineError> {
        self.check(symbol)?;
        let mut bars: Vec<OhlcvBar> = self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start_date.is_none_or(|s| b.date >= s))
                    .filter(|b| end_date.is_none_or(|e| b.date <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.data.keys().cloned().collect())
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        self.check(symbol)?;
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

impl RebalancePort for MockStore {
    fn fetch_snapshot(
        &self,
        strategy: StrategyKind,
        day: NaiveDate,
    ) -> Result<Option<RebalanceSnapshot>, EngineError> {
        Ok(self
            .snapshots
            .iter()
            .find(|s| s.strategy == strategy && s.date == day)
            .cloned())
    }

    fn fetch_previous_snapshot(
        &self,
        strategy: StrategyKind,
        day: NaiveDate,
    ) -> Result<Option<RebalanceSnapshot>, EngineError> {
        Ok(self
            .snapshots
            .iter()
            .filter(|s| s.strategy == strategy && s.date < day)
            .max_by_key(|s| s.date)
            .cloned())
    }

    fn list_rebalance_dates(&self, strategy: StrategyKind) -> Result<Vec<NaiveDate>, EngineError> {
        Ok(self
            .snapshots
            .iter()
            .filter(|s| s.strategy == strategy)
            .map(|s| s.date)
            .collect())
    }
}

impl PortfolioPort for MockStore {
    fn fetch_portfolio_values(
        &self,
        strategy: StrategyKind,
    ) -> Result<Vec<PortfolioValuePoint>, EngineError> {
        Ok(self
            .values
            .iter()
            .filter(|(s, _)| *s == strategy)
            .map(|(_, p)| *p)
            .collect())
    }
}

impl TradePort for MockStore {
    fn fetch_trades(
        &self,
        strategy: StrategyKind,
        status: StatusFilter,
    ) -> Result<Vec<TradeRecord>, EngineError> {
        Ok(self
            .trades
            .iter()
            .filter(|t| t.strategy == strategy && status.accepts(t.status))
            .cloned()
            .collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, day: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: day,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
    }
}

/// `count` consecutive daily bars from 2024-01-01, closes stepping by `step`.
pub fn generate_bars(symbol: &str, count: usize, start_close: f64, step: f64) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    (0..count)
        .map(|i| {
            make_bar(
                symbol,
                start + Duration::days(i as i64),
                start_close + step * i as f64,
            )
        })
        .collect()
}

pub fn open_trade(symbol: &str, strategy: StrategyKind, entry: NaiveDate, price: f64) -> TradeRecord {
    TradeRecord {
        symbol: symbol.to_string(),
        strategy,
        entry_date: entry,
        exit_date: None,
        entry_price: price,
        exit_price: None,
        quantity: 10.0,
        status: TradeStatus::Open,
        return_pct: None,
    }
}

pub fn closed_trade(
    symbol: &str,
    strategy: StrategyKind,
    entry: NaiveDate,
    exit: NaiveDate,
    entry_price: f64,
    exit_price: f64,
) -> TradeRecord {
    TradeRecord {
        symbol: symbol.to_string(),
        strategy,
        entry_date: entry,
        exit_date: Some(exit),
        entry_price,
        exit_price: Some(exit_price),
        quantity: 10.0,
        status: TradeStatus::Closed,
        return_pct: None,
    }
}
