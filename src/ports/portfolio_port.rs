//! Portfolio value series access port trait.

use crate::domain::error::EngineError;
use crate::domain::metrics::PortfolioValuePoint;
use crate::domain::strategy::StrategyKind;

pub trait PortfolioPort {
    fn fetch_portfolio_values(
        &self,
        strategy: StrategyKind,
    ) -> Result<Vec<PortfolioValuePoint>, EngineError>;
}
