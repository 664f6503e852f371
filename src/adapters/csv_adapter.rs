//! CSV directory store adapter.
//!
//! Layout under the base directory:
//!
//! ```text
//! ohlcv/<SYMBOL>.csv     date,open,high,low,close,volume
//! rebalance.csv          strategy,date,symbol
//! portfolio_values.csv   strategy,date,value
//! trades.csv             symbol,strategy,entry_date,exit_date,entry_price,exit_price,quantity,status,return_pct
//! ```
//!
//! Optional trade columns are left empty. A missing file reads as no rows.

use crate::domain::error::EngineError;
use crate::domain::metrics::PortfolioValuePoint;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::rebalance::{snapshots_from_rows, RebalanceRow, RebalanceSnapshot};
use crate::domain::strategy::StrategyKind;
use crate::domain::trade::{StatusFilter, TradeRecord};
use crate::ports::data_port::DataPort;
use crate::ports::portfolio_port::PortfolioPort;
use crate::ports::rebalance_port::RebalancePort;
use crate::ports::trade_port::TradePort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const OHLCV_DIR: &str = "ohlcv";
const REBALANCE_FILE: &str = "rebalance.csv";
const PORTFOLIO_FILE: &str = "portfolio_values.csv";
const TRADES_FILE: &str = "trades.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Reads one CSV file with positional access and line-aware errors.
struct Rows {
    path: PathBuf,
    records: Vec<StringRecord>,
}

impl Rows {
    fn load(path: PathBuf) -> Result<Self, EngineError> {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    records: Vec::new(),
                });
            }
            Err(e) => {
                return Err(EngineError::unavailable(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EngineError::invalid(format!("{}: CSV parse error: {}", path.display(), e)))?;

        Ok(Self { path, records })
    }

    fn error(&self, record: &StringRecord, message: String) -> EngineError {
        let line = record.position().map_or(0, |p| p.line());
        EngineError::invalid(format!("{}:{}: {}", self.path.display(), line, message))
    }

    fn text<'r>(&self, record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str, EngineError> {
        record
            .get(index)
            .ok_or_else(|| self.error(record, format!("missing {} column", name)))
    }

    fn parse<T>(&self, record: &StringRecord, index: usize, name: &str) -> Result<T, EngineError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.text(record, index, name)?
            .parse()
            .map_err(|e| self.error(record, format!("invalid {} value: {}", name, e)))
    }

    fn parse_optional<T>(
        &self,
        record: &StringRecord,
        index: usize,
        name: &str,
    ) -> Result<Option<T>, EngineError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match record.get(index) {
            None | Some("") => Ok(None),
            Some(_) => self.parse(record, index, name).map(Some),
        }
    }

    fn date(&self, record: &StringRecord, index: usize, name: &str) -> Result<NaiveDate, EngineError> {
        let text = self.text(record, index, name)?;
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| self.error(record, format!("invalid {} format: {}", name, e)))
    }

    fn optional_date(
        &self,
        record: &StringRecord,
        index: usize,
        name: &str,
    ) -> Result<Option<NaiveDate>, EngineError> {
        match record.get(index) {
            None | Some("") => Ok(None),
            Some(_) => self.date(record, index, name).map(Some),
        }
    }

    fn strategy(&self, record: &StringRecord, index: usize) -> Result<StrategyKind, EngineError> {
        let text = self.text(record, index, "strategy")?;
        text.parse()
            .map_err(|e: EngineError| self.error(record, e.to_string()))
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn ohlcv_dir(&self) -> PathBuf {
        self.base_path.join(OHLCV_DIR)
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.ohlcv_dir().join(format!("{}.csv", symbol))
    }

    /// Every rebalance row in the file, in file order.
    pub fn read_rebalance_rows(&self) -> Result<Vec<RebalanceRow>, EngineError> {
        let rows = Rows::load(self.base_path.join(REBALANCE_FILE))?;
        rows.records
            .iter()
            .map(|record| {
                Ok(RebalanceRow {
                    strategy: rows.strategy(record, 0)?,
                    date: rows.date(record, 1, "date")?,
                    symbol: rows.text(record, 2, "symbol")?.to_string(),
                })
            })
            .collect()
    }

    fn snapshots(&self, strategy: StrategyKind) -> Result<Vec<RebalanceSnapshot>, EngineError> {
        let rows: Vec<RebalanceRow> = self
            .read_rebalance_rows()?
            .into_iter()
            .filter(|r| r.strategy == strategy)
            .collect();
        snapshots_from_rows(&rows)
    }

    /// Every portfolio value point, tagged with its strategy.
    pub fn read_portfolio_values(&self) -> Result<Vec<(StrategyKind, PortfolioValuePoint)>, EngineError> {
        let rows = Rows::load(self.base_path.join(PORTFOLIO_FILE))?;
        rows.records
            .iter()
            .map(|record| {
                Ok((
                    rows.strategy(record, 0)?,
                    PortfolioValuePoint {
                        date: rows.date(record, 1, "date")?,
                        value: rows.parse(record, 2, "value")?,
                    },
                ))
            })
            .collect()
    }

    /// Every trade journal record, in file order.
    pub fn read_trades(&self) -> Result<Vec<TradeRecord>, EngineError> {
        let rows = Rows::load(self.base_path.join(TRADES_FILE))?;
        rows.records
            .iter()
            .map(|record| {
                Ok(TradeRecord {
                    symbol: rows.text(record, 0, "symbol")?.to_string(),
                    strategy: rows.strategy(record, 1)?,
                    entry_date: rows.date(record, 2, "entry_date")?,
                    exit_date: rows.optional_date(record, 3, "exit_date")?,
                    entry_price: rows.parse(record, 4, "entry_price")?,
                    exit_price: rows.parse_optional(record, 5, "exit_price")?,
                    quantity: rows.parse(record, 6, "quantity")?,
                    status: rows.parse(record, 7, "status")?,
                    return_pct: rows.parse_optional(record, 8, "return_pct")?,
                })
            })
            .collect()
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, EngineError> {
        let rows = Rows::load(self.csv_path(symbol))?;
        let mut bars = Vec::new();

        for record in &rows.records {
            let date = rows.date(record, 0, "date")?;
            if start_date.is_some_and(|d| date < d) || end_date.is_some_and(|d| date > d) {
                continue;
            }

            bars.push(OhlcvBar {
                symbol: symbol.to_string(),
                date,
                open: rows.parse(record, 1, "open")?,
                high: rows.parse(record, 2, "high")?,
                low: rows.parse(record, 3, "low")?,
                close: rows.parse(record, 4, "close")?,
                volume: rows.parse(record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let dir = self.ohlcv_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(EngineError::unavailable(format!(
                    "failed to read directory {}: {}",
                    dir.display(),
                    e
                )));
            }
        };

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                EngineError::unavailable(format!("directory entry error: {}", e))
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        let bars = self.fetch_ohlcv(symbol, None, None)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

impl RebalancePort for CsvAdapter {
    fn fetch_snapshot(
        &self,
        strategy: StrategyKind,
        date: NaiveDate,
    ) -> Result<Option<RebalanceSnapshot>, EngineError> {
        Ok(self
            .snapshots(strategy)?
            .into_iter()
            .find(|s| s.date == date))
    }

    fn fetch_previous_snapshot(
        &self,
        strategy: StrategyKind,
        date: NaiveDate,
    ) -> Result<Option<RebalanceSnapshot>, EngineError> {
        Ok(self
            .snapshots(strategy)?
            .into_iter()
            .filter(|s| s.date < date)
            .max_by_key(|s| s.date))
    }

    fn list_rebalance_dates(&self, strategy: StrategyKind) -> Result<Vec<NaiveDate>, EngineError> {
        Ok(self
            .read_rebalance_rows()?
            .into_iter()
            .filter(|r| r.strategy == strategy)
            .map(|r| r.date)
            .collect())
    }
}

impl PortfolioPort for CsvAdapter {
    fn fetch_portfolio_values(
        &self,
        strategy: StrategyKind,
    ) -> Result<Vec<PortfolioValuePoint>, EngineError> {
        let mut points: Vec<PortfolioValuePoint> = self
            .read_portfolio_values()?
            .into_iter()
            .filter(|(s, _)| *s == strategy)
            .map(|(_, p)| p)
            .collect();
        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

impl TradePort for CsvAdapter {
    fn fetch_trades(
        &self,
        strategy: StrategyKind,
        status: StatusFilter,
    ) -> Result<Vec<TradeRecord>, EngineError> {
        Ok(self
            .read_trades()?
            .into_iter()
            .filter(|t| t.strategy == strategy && status.accepts(t.status))
            .collect())
    }
}
