//! Run outputs: the append-only trade log and the per-bar equity curve.

use super::order::OrderSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One executed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub timestamp: NaiveDateTime,
    pub side: OrderSide,
    pub size: u64,
    pub price: f64,
    pub commission: f64,
    /// Broker cash immediately after the fill.
    pub resulting_cash: f64,
}

impl TradeLogEntry {
    pub fn notional(&self) -> f64 {
        self.size as f64 * self.price
    }
}

/// Post-trade equity at one bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}
