//! SMA crossover strategy: the FLAT/LONG state machine.
//!
//! One step per bar, evaluated after indicators and the crossover detector have
//! been updated:
//! - FLAT + cross up   → size the entry; BUY and go LONG if size > 0
//! - LONG + cross down → SELL the whole position and go FLAT
//! - anything else     → hold
//!
//! `decide` is a pure function of current-bar inputs. It never sees future bars
//! and never mutates the portfolio; the engine applies the returned order.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, StrategyParams};
use crate::domain::Order;
use crate::signals::Signal;
use crate::sizers::PercentOfEquity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyState {
    #[default]
    Flat,
    /// Holding `size` shares bought on entry.
    Long { size: u64 },
}

impl StrategyState {
    pub fn is_long(&self) -> bool {
        matches!(self, StrategyState::Long { .. })
    }
}

/// Why a step produced no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    /// No actionable (state, signal) combination.
    NoAction,
    /// Cross up while flat, but the sizer returned zero shares.
    ZeroSize,
}

/// Outcome of one strategy step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub next_state: StrategyState,
    pub order: Option<Order>,
    pub hold: Option<Hold>,
}

impl Decision {
    fn hold(state: StrategyState, reason: Hold) -> Self {
        Self {
            next_state: state,
            order: None,
            hold: Some(reason),
        }
    }

    fn trade(next_state: StrategyState, order: Order) -> Self {
        Self {
            next_state,
            order: Some(order),
            hold: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmaCross {
    params: StrategyParams,
    sizer: PercentOfEquity,
}

impl SmaCross {
    pub fn new(params: StrategyParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let sizer = PercentOfEquity::new(params.fraction)?;
        Ok(Self { params, sizer })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn sizer(&self) -> &PercentOfEquity {
        &self.sizer
    }

    pub fn decide(
        &self,
        state: StrategyState,
        signal: Signal,
        equity: f64,
        price: f64,
    ) -> Decision {
        match (state, signal) {
            (StrategyState::Flat, Signal::CrossUp) => {
                let size = self.sizer.size(equity, price);
                if size == 0 {
                    Decision::hold(state, Hold::ZeroSize)
                } else {
                    Decision::trade(StrategyState::Long { size }, Order::buy(size, price))
                }
            }
            (StrategyState::Long { size }, Signal::CrossDown) => {
                Decision::trade(StrategyState::Flat, Order::sell(size, price))
            }
            _ => Decision::hold(state, Hold::NoAction),
        }
    }
}
