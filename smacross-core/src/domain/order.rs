//! Market orders emitted by the strategy and consumed by the broker.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order filled in full at `price`.
///
/// Lives for a single bar: created by the strategy, consumed by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub side: OrderSide,
    pub size: u64,
    pub price: f64,
}

impl Order {
    pub fn buy(size: u64, price: f64) -> Self {
        Self {
            side: OrderSide::Buy,
            size,
            price,
        }
    }

    pub fn sell(size: u64, price: f64) -> Self {
        Self {
            side: OrderSide::Sell,
            size,
            price,
        }
    }

    /// Gross notional value, before commission.
    pub fn notional(&self) -> f64 {
        self.size as f64 * self.price
    }

    /// Same order, repriced (used when the fill happens at a later bar's open).
    pub fn at_price(self, price: f64) -> Self {
        Self { price, ..self }
    }
}
