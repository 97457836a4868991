//! Run result types.

use serde::{Deserialize, Serialize};

use crate::config::FillTiming;
use crate::domain::{EquityPoint, Position, TradeLogEntry};

/// Result of a complete backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Broker value before the first bar (the starting cash).
    pub starting_value: f64,
    /// Cash + position marked at the last close.
    pub final_equity: f64,
    /// Executed orders in execution order.
    pub trade_log: Vec<TradeLogEntry>,
    /// One post-trade point per bar.
    pub equity_curve: Vec<EquityPoint>,
    /// Total number of bars processed.
    pub bar_count: usize,
    /// The slow average never became defined: fewer bars than the slow period.
    pub insufficient_data: bool,
    /// Cross-ups that sized to zero shares.
    pub zero_size_skips: usize,
    /// Queued orders that never executed (next-bar-open only).
    pub dropped_orders: usize,
    /// Position still open after the last bar.
    pub final_position: Position,
    pub total_commission: f64,
    pub fill_timing: FillTiming,
}

impl RunResult {
    pub fn total_return(&self) -> f64 {
        if self.starting_value > 0.0 {
            self.final_equity / self.starting_value - 1.0
        } else {
            0.0
        }
    }

    pub fn trade_count(&self) -> usize {
        self.trade_log.len()
    }
}
