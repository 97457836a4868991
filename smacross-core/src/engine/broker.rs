//! Broker simulator: executes market orders against cash and the single position.
//!
//! The broker exclusively owns the portfolio state. Nothing else mutates cash or
//! holdings; everything else reads through `value()` / `portfolio()`.
//!
//! Commission is a rate on notional, charged on both sides:
//! - Buy: cash -= size * price * (1 + rate)
//! - Sell: cash += size * price * (1 - rate)

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Order, OrderSide, Position, TradeLogEntry};

/// Broker-side guard failures. Each indicates a sizing or sequencing bug in the
/// caller and aborts the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error("insufficient funds: order needs {required:.2} but only {available:.2} cash is available")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("cannot buy while a position of {held} shares is open")]
    PositionAlreadyOpen { held: u64 },

    #[error("cannot sell: no open position")]
    NoPosition,

    #[error("sell of {requested} shares does not match open position of {held}")]
    SizeMismatch { requested: u64, held: u64 },

    #[error("invalid order: size {size} at price {price}")]
    InvalidOrder { size: u64, price: f64 },
}

/// Cash, the open position and the commission rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub position: Position,
    pub commission_rate: f64,
}

#[derive(Debug, Clone)]
pub struct Broker {
    state: PortfolioState,
    starting_cash: f64,
    total_commission: f64,
}

impl Broker {
    pub fn new(starting_cash: f64, commission_rate: f64) -> Self {
        Self {
            state: PortfolioState {
                cash: starting_cash,
                position: Position::flat(),
                commission_rate,
            },
            starting_cash,
            total_commission: 0.0,
        }
    }

    pub fn execute(
        &mut self,
        order: &Order,
        timestamp: NaiveDateTime,
    ) -> Result<TradeLogEntry, BrokerError> {
        if order.size == 0 || !(order.price > 0.0) || !order.price.is_finite() {
            return Err(BrokerError::InvalidOrder {
                size: order.size,
                price: order.price,
            });
        }

        let notional = order.notional();
        let commission = notional * self.state.commission_rate;

        match order.side {
            OrderSide::Buy => {
                if !self.state.position.is_flat() {
                    return Err(BrokerError::PositionAlreadyOpen {
                        held: self.state.position.size,
                    });
                }
                let required = notional + commission;
                if self.state.cash < required {
                    return Err(BrokerError::InsufficientFunds {
                        required,
                        available: self.state.cash,
                    });
                }
                self.state.cash -= required;
                self.state.position = Position::long(order.size, order.price);
            }
            OrderSide::Sell => {
                let held = self.state.position.size;
                if held == 0 {
                    return Err(BrokerError::NoPosition);
                }
                if order.size != held {
                    return Err(BrokerError::SizeMismatch {
                        requested: order.size,
                        held,
                    });
                }
                self.state.cash += notional - commission;
                self.state.position = Position::flat();
            }
        }

        self.total_commission += commission;

        Ok(TradeLogEntry {
            timestamp,
            side: order.side,
            size: order.size,
            price: order.price,
            commission,
            resulting_cash: self.state.cash,
        })
    }

    /// Equity at `price`: cash + position size * price.
    pub fn value(&self, price: f64) -> f64 {
        self.state.cash + self.state.position.market_value(price)
    }

    /// Largest whole share count a buy at `price` can pay for, commission included.
    pub fn affordable_shares(&self, price: f64) -> u64 {
        if !(price > 0.0) {
            return 0;
        }
        let per_share = price * (1.0 + self.state.commission_rate);
        let estimate = (self.state.cash / per_share).floor();
        if !(estimate.is_finite() && estimate >= 1.0) {
            return 0;
        }
        let mut shares = estimate as u64;
        // Guard against the estimate rounding one share above what `execute` accepts.
        while shares > 0 && !self.can_afford(shares, price) {
            shares -= 1;
        }
        shares
    }

    fn can_afford(&self, shares: u64, price: f64) -> bool {
        let notional = shares as f64 * price;
        notional + notional * self.state.commission_rate <= self.state.cash
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.state
    }

    pub fn cash(&self) -> f64 {
        self.state.cash
    }

    pub fn position(&self) -> Position {
        self.state.position
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }
}
