//! Borrowed, date-sorted view over one symbol's bars.
//!
//! Caller ordering is never trusted: bars are validated, sorted ascending and
//! checked for duplicate dates before any scoring pass reads them.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone)]
pub struct SymbolSeries<'a> {
    symbol: &'a str,
    bars: Vec<&'a OhlcvBar>,
}

impl<'a> SymbolSeries<'a> {
    pub fn new(symbol: &'a str, bars: &'a [OhlcvBar]) -> Result<Self, EngineError> {
        for bar in bars {
            bar.validate()?;
        }

        let mut sorted: Vec<&OhlcvBar> = bars.iter().collect();
        sorted.sort_by_key(|b| b.date);

        if let Some(pair) = sorted.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(EngineError::invalid(format!(
                "{}: duplicate bar date {}",
                symbol, pair[0].date
            )));
        }

        Ok(Self {
            symbol,
            bars: sorted,
        })
    }

    pub fn symbol(&self) -> &str {
        self.symbol
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[&'a OhlcvBar] {
        &self.bars
    }

    /// The last `size` bars, or the whole series when shorter.
    pub fn tail(&self, size: usize) -> &[&'a OhlcvBar] {
        let start = self.bars.len().saturating_sub(size);
        &self.bars[start..]
    }

    pub fn require(&self, minimum: usize) -> Result<(), EngineError> {
        if self.bars.len() < minimum {
            return Err(EngineError::InsufficientData {
                subject: self.symbol.to_string(),
                have: self.bars.len(),
                need: minimum,
            });
        }
        Ok(())
    }
}
