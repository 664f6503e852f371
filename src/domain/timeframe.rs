//! Daily to weekly/monthly bar aggregation.

use crate::domain::error::EngineError;
use crate::domain::numeric::round2;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::SymbolSeries;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    fn bucket(&self, date: NaiveDate) -> (i32, u32) {
        match self {
            Timeframe::Daily => (date.year(), date.ordinal()),
            Timeframe::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            Timeframe::Monthly => (date.year(), date.month()),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Daily => write!(f, "daily"),
            Timeframe::Weekly => write!(f, "weekly"),
            Timeframe::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Timeframe {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "1d" | "d" => Ok(Timeframe::Daily),
            "weekly" | "1w" | "w" => Ok(Timeframe::Weekly),
            "monthly" | "1m" | "m" => Ok(Timeframe::Monthly),
            other => Err(EngineError::invalid(format!("unknown timeframe '{}'", other))),
        }
    }
}

/// Aggregate `bars` into `timeframe` buckets, oldest first. Each output bar
/// carries the date of the last daily bar in its bucket.
pub fn resample(
    symbol: &str,
    bars: &[OhlcvBar],
    timeframe: Timeframe,
) -> Result<Vec<OhlcvBar>, EngineError> {
    let series = SymbolSeries::new(symbol, bars)?;

    let mut out: Vec<OhlcvBar> = Vec::new();
    let mut current_bucket = None;
    for bar in series.bars() {
        let bucket = timeframe.bucket(bar.date);
        match out.last_mut() {
            Some(agg) if current_bucket == Some(bucket) => {
                agg.date = bar.date;
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                out.push((*bar).clone());
                current_bucket = Some(bucket);
            }
        }
    }
    Ok(out)
}

/// Headline figures for the most recent bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSummary {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub change_pct: f64,
}

impl BarSummary {
    /// `None` for an empty series.
    pub fn latest(symbol: &str, bars: &[OhlcvBar]) -> Result<Option<Self>, EngineError> {
        let series = SymbolSeries::new(symbol, bars)?;
        Ok(series.bars().last().map(|bar| BarSummary {
            symbol: series.symbol().to_string(),
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            change_pct: round2(bar.change_pct()),
        }))
    }
}
