//! OHLCV bar representation.

use crate::domain::error::EngineError;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// Rejects non-finite or non-positive prices, negative volume and
    /// a high below the low.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, price) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !price.is_finite() || price <= 0.0 {
                return Err(EngineError::invalid(format!(
                    "{} on {}: {} must be a positive number, got {}",
                    self.symbol, self.date, name, price
                )));
            }
        }
        if self.volume < 0 {
            return Err(EngineError::invalid(format!(
                "{} on {}: volume must be non-negative, got {}",
                self.symbol, self.date, self.volume
            )));
        }
        if self.high < self.low {
            return Err(EngineError::invalid(format!(
                "{} on {}: high {} is below low {}",
                self.symbol, self.date, self.high, self.low
            )));
        }
        Ok(())
    }

    /// (close - open) / open * 100; 0 when open is 0.
    pub fn change_pct(&self) -> f64 {
        if self.open == 0.0 {
            0.0
        } else {
            (self.close - self.open) / self.open * 100.0
        }
    }

    /// close * volume, the traded value of the bar.
    pub fn mass(&self) -> f64 {
        self.close * self.volume as f64
    }
}
