//! Port traits: the seams between the engine and its stores and outputs.

pub mod config_port;
pub mod data_port;
pub mod portfolio_port;
pub mod rebalance_port;
pub mod report_port;
pub mod trade_port;

pub use data_port::DataPort;
pub use portfolio_port::PortfolioPort;
pub use rebalance_port::RebalancePort;
pub use trade_port::TradePort;

/// A store that serves every read port. Adapters get it for free.
pub trait Store: DataPort + RebalancePort + PortfolioPort + TradePort {
    fn data(&self) -> &dyn DataPort;
    fn rebalance(&self) -> &dyn RebalancePort;
    fn portfolio(&self) -> &dyn PortfolioPort;
    fn trades(&self) -> &dyn TradePort;
}

impl<T: DataPort + RebalancePort + PortfolioPort + TradePort> Store for T {
    fn data(&self) -> &dyn DataPort {
        self
    }

    fn rebalance(&self) -> &dyn RebalancePort {
        self
    }

    fn portfolio(&self) -> &dyn PortfolioPort {
        self
    }

    fn trades(&self) -> &dyn TradePort {
        self
    }
}
