//! SQLite store adapter.
//!
//! Dates are stored as `YYYY-MM-DD` text, strategies by their store key and
//! trade status in lowercase.

use crate::domain::error::EngineError;
use crate::domain::metrics::PortfolioValuePoint;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::rebalance::{snapshots_from_rows, RebalanceRow, RebalanceSnapshot};
use crate::domain::strategy::StrategyKind;
use crate::domain::trade::{StatusFilter, TradeRecord, TradeStatus};
use crate::ports::data_port::DataPort;
use crate::ports::portfolio_port::PortfolioPort;
use crate::ports::rebalance_port::RebalancePort;
use crate::ports::trade_port::TradePort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Params, Row};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> EngineError {
    EngineError::unavailable(format!("sqlite pool: {}", e))
}

fn query_error(e: rusqlite::Error) -> EngineError {
    EngineError::unavailable(format!("sqlite query: {}", e))
}

fn parse_date(text: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| EngineError::invalid(format!("stored date '{}': {}", text, e)))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

struct RawTrade {
    symbol: String,
    strategy: String,
    entry_date: String,
    exit_date: Option<String>,
    entry_price: f64,
    exit_price: Option<f64>,
    quantity: f64,
    status: String,
    return_pct: Option<f64>,
}

impl RawTrade {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            symbol: row.get(0)?,
            strategy: row.get(1)?,
            entry_date: row.get(2)?,
            exit_date: row.get(3)?,
            entry_price: row.get(4)?,
            exit_price: row.get(5)?,
            quantity: row.get(6)?,
            status: row.get(7)?,
            return_pct: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<TradeRecord, EngineError> {
        Ok(TradeRecord {
            symbol: self.symbol,
            strategy: self.strategy.parse()?,
            entry_date: parse_date(&self.entry_date)?,
            exit_date: self.exit_date.as_deref().map(parse_date).transpose()?,
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            quantity: self.quantity,
            status: self.status.parse()?,
            return_pct: self.return_pct,
        })
    }
}

impl SqliteAdapter {
    pub fn open(path: &Path, pool_size: u32) -> Result<Self, EngineError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, EngineError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, EngineError> {
        self.pool.get().map_err(pool_error)
    }

    fn query_rows<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>, EngineError>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_error)?;
        let rows = stmt.query_map(params, f).map_err(query_error)?;
        rows.collect::<rusqlite::Result<Vec<T>>>()
            .map_err(query_error)
    }

    pub fn initialize_schema(&self) -> Result<(), EngineError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ohlcv (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (symbol, date)
            );
            CREATE INDEX IF NOT EXISTS idx_ohlcv_date ON ohlcv(date);
            CREATE TABLE IF NOT EXISTS rebalance (
                strategy TEXT NOT NULL,
                date TEXT NOT NULL,
                symbol TEXT NOT NULL,
                PRIMARY KEY (strategy, date, symbol)
            );
            CREATE TABLE IF NOT EXISTS portfolio_value (
                strategy TEXT NOT NULL,
                date TEXT NOT NULL,
                value REAL NOT NULL,
                PRIMARY KEY (strategy, date)
            );
            CREATE TABLE IF NOT EXISTS trade_journal (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                strategy TEXT NOT NULL,
                entry_date TEXT NOT NULL,
                exit_date TEXT,
                entry_price REAL NOT NULL,
                exit_price REAL,
                quantity REAL NOT NULL,
                status TEXT NOT NULL,
                return_pct REAL
            );
            CREATE INDEX IF NOT EXISTS idx_trade_strategy ON trade_journal(strategy);",
        )
        .map_err(query_error)
    }

    pub fn insert_bars(&self, bars: &[OhlcvBar]) -> Result<(), EngineError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO ohlcv (symbol, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.symbol,
                    format_date(bar.date),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_error)?;
        }
        tx.commit().map_err(query_error)
    }

    pub fn insert_rebalance_rows(&self, rows: &[RebalanceRow]) -> Result<(), EngineError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;
        for row in rows {
            tx.execute(
                "INSERT OR REPLACE INTO rebalance (strategy, date, symbol) VALUES (?1, ?2, ?3)",
                params![row.strategy.store_key(), format_date(row.date), row.symbol],
            )
            .map_err(query_error)?;
        }
        tx.commit().map_err(query_error)
    }

    pub fn insert_portfolio_values(
        &self,
        points: &[(StrategyKind, PortfolioValuePoint)],
    ) -> Result<(), EngineError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;
        for (strategy, point) in points {
            tx.execute(
                "INSERT OR REPLACE INTO portfolio_value (strategy, date, value) VALUES (?1, ?2, ?3)",
                params![strategy.store_key(), format_date(point.date), point.value],
            )
            .map_err(query_error)?;
        }
        tx.commit().map_err(query_error)
    }

    pub fn insert_trades(&self, trades: &[TradeRecord]) -> Result<(), EngineError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;
        for trade in trades {
            tx.execute(
                "INSERT INTO trade_journal
                    (symbol, strategy, entry_date, exit_date, entry_price, exit_price, quantity, status, return_pct)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    trade.symbol,
                    trade.strategy.store_key(),
                    format_date(trade.entry_date),
                    trade.exit_date.map(format_date),
                    trade.entry_price,
                    trade.exit_price,
                    trade.quantity,
                    trade.status.to_string(),
                    trade.return_pct
                ],
            )
            .map_err(query_error)?;
        }
        tx.commit().map_err(query_error)
    }

    fn snapshot_on(
        &self,
        strategy: StrategyKind,
        date: String,
    ) -> Result<Option<RebalanceSnapshot>, EngineError> {
        let symbols: Vec<String> = self.query_rows(
            "SELECT symbol FROM rebalance WHERE strategy = ?1 AND date = ?2 ORDER BY symbol",
            params![strategy.store_key(), date],
            |row| row.get(0),
        )?;
        let date = parse_date(&date)?;
        let rows: Vec<RebalanceRow> = symbols
            .into_iter()
            .map(|symbol| RebalanceRow {
                strategy,
                date,
                symbol,
            })
            .collect();
        Ok(snapshots_from_rows(&rows)?.into_iter().next())
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, EngineError> {
        let start_str = start_date.map(format_date);
        let end_str = end_date.map(format_date);

        let rows: Vec<(String, f64, f64, f64, f64, i64)> = self.query_rows(
            "SELECT date, open, high, low, close, volume
             FROM ohlcv
             WHERE symbol = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date ASC",
            params![symbol, start_str, end_str],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )?;

        rows.into_iter()
            .map(|(date, open, high, low, close, volume)| {
                Ok(OhlcvBar {
                    symbol: symbol.to_string(),
                    date: parse_date(&date)?,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            })
            .collect()
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        self.query_rows(
            "SELECT DISTINCT symbol FROM ohlcv ORDER BY symbol",
            [],
            |row| row.get(0),
        )
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM ohlcv WHERE symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => Ok(Some((
                parse_date(&min_str)?,
                parse_date(&max_str)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }
}

impl RebalancePort for SqliteAdapter {
    fn fetch_snapshot(
        &self,
        strategy: StrategyKind,
        date: NaiveDate,
    ) -> Result<Option<RebalanceSnapshot>, EngineError> {
        self.snapshot_on(strategy, format_date(date))
    }

    fn fetch_previous_snapshot(
        &self,
        strategy: StrategyKind,
        date: NaiveDate,
    ) -> Result<Option<RebalanceSnapshot>, EngineError> {
        let conn = self.conn()?;
        let previous: Option<String> = conn
            .query_row(
                "SELECT MAX(date) FROM rebalance WHERE strategy = ?1 AND date < ?2",
                params![strategy.store_key(), format_date(date)],
                |row| row.get(0),
            )
            .map_err(query_error)?;
        drop(conn);

        match previous {
            Some(previous) => self.snapshot_on(strategy, previous),
            None => Ok(None),
        }
    }

    fn list_rebalance_dates(&self, strategy: StrategyKind) -> Result<Vec<NaiveDate>, EngineError> {
        let dates: Vec<String> = self.query_rows(
            "SELECT DISTINCT date FROM rebalance WHERE strategy = ?1",
            params![strategy.store_key()],
            |row| row.get(0),
        )?;
        dates.iter().map(|d| parse_date(d)).collect()
    }
}

impl PortfolioPort for SqliteAdapter {
    fn fetch_portfolio_values(
        &self,
        strategy: StrategyKind,
    ) -> Result<Vec<PortfolioValuePoint>, EngineError> {
        let rows: Vec<(String, f64)> = self.query_rows(
            "SELECT date, value FROM portfolio_value WHERE strategy = ?1 ORDER BY date ASC",
            params![strategy.store_key()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        rows.into_iter()
            .map(|(date, value)| {
                Ok(PortfolioValuePoint {
                    date: parse_date(&date)?,
                    value,
                })
            })
            .collect()
    }
}

impl TradePort for SqliteAdapter {
    fn fetch_trades(
        &self,
        strategy: StrategyKind,
        status: StatusFilter,
    ) -> Result<Vec<TradeRecord>, EngineError> {
        let status_param: Option<String> = match status {
            StatusFilter::Open => Some(TradeStatus::Open.to_string()),
            StatusFilter::Closed => Some(TradeStatus::Closed.to_string()),
            StatusFilter::All => None,
        };
        let raw = self.query_rows(
            "SELECT symbol, strategy, entry_date, exit_date, entry_price, exit_price, quantity, status, return_pct
             FROM trade_journal
             WHERE strategy = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY entry_date DESC, id ASC",
            params![strategy.store_key(), status_param],
            RawTrade::from_row,
        )?;
        raw.into_iter().map(RawTrade::into_record).collect()
    }
}
