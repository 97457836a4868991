//! Backtesting engine: the broker simulator and the bar-by-bar event loop.
//!
//! The engine consumes a validated [`BarSeries`](crate::domain::BarSeries) and
//! runs the SMA crossover strategy over it in a single pass.

pub mod broker;
pub mod event_loop;
pub mod state;

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::BarError;

pub use broker::{Broker, BrokerError, PortfolioState};
pub use event_loop::{run_backtest, run_backtest_on, Engine};
pub use state::RunResult;

/// Anything that aborts a backtest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid bar data: {0}")]
    InvalidBar(#[from] BarError),

    #[error("broker rejected order: {0}")]
    Broker(#[from] BrokerError),
}
