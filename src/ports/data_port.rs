//! Daily bar access port trait.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` within the optional inclusive date bounds, oldest
    /// first. An unknown symbol yields an empty list.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, EngineError>;

    /// Every symbol with stored bars, sorted.
    fn list_symbols(&self) -> Result<Vec<String>, EngineError>;

    /// `(first date, last date, bar count)` for `symbol`, `None` when it has
    /// no bars.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError>;
}
