//! Trade journal access port trait.

use crate::domain::error::EngineError;
use crate::domain::strategy::StrategyKind;
use crate::domain::trade::{StatusFilter, TradeRecord};

pub trait TradePort {
    fn fetch_trades(
        &self,
        strategy: StrategyKind,
        status: StatusFilter,
    ) -> Result<Vec<TradeRecord>, EngineError>;
}
