//! Rebalance snapshot access port trait.

use crate::domain::error::EngineError;
use crate::domain::rebalance::RebalanceSnapshot;
use crate::domain::strategy::StrategyKind;
use chrono::NaiveDate;

pub trait RebalancePort {
    /// The snapshot dated exactly `date`, if any.
    fn fetch_snapshot(
        &self,
        strategy: StrategyKind,
        date: NaiveDate,
    ) -> Result<Option<RebalanceSnapshot>, EngineError>;

    /// The most recent snapshot dated strictly before `date`.
    fn fetch_previous_snapshot(
        &self,
        strategy: StrategyKind,
        date: NaiveDate,
    ) -> Result<Option<RebalanceSnapshot>, EngineError>;

    /// Every date with a snapshot for `strategy`, in no particular order.
    fn list_rebalance_dates(&self, strategy: StrategyKind) -> Result<Vec<NaiveDate>, EngineError>;
}
