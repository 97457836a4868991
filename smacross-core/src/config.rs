//! Engine and strategy configuration, validated before any bar is processed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid configuration. Raised at setup, never mid-run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} period must be a positive integer")]
    NonPositivePeriod { name: &'static str },

    #[error("target fraction {0} must lie in (0, 1]")]
    FractionOutOfRange(f64),

    #[error("commission rate {0} must lie in [0, 1)")]
    CommissionOutOfRange(f64),

    #[error("starting cash {0} must be positive")]
    NonPositiveCash(f64),
}

/// When an order decided on bar `t` is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillTiming {
    /// Fill at the close of the bar the signal was computed on.
    #[default]
    SameBarClose,
    /// Fill at the open of the following bar.
    NextBarOpen,
}

/// Strategy parameters: the two SMA periods and the equity fraction per entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub fraction: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
            fraction: 0.3,
        }
    }
}

impl StrategyParams {
    pub fn new(fast_period: usize, slow_period: usize, fraction: f64) -> Self {
        Self {
            fast_period,
            slow_period,
            fraction,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast_period == 0 {
            return Err(ConfigError::NonPositivePeriod { name: "fast" });
        }
        if self.slow_period == 0 {
            return Err(ConfigError::NonPositivePeriod { name: "slow" });
        }
        validate_fraction(self.fraction)
    }
}

pub(crate) fn validate_fraction(fraction: f64) -> Result<(), ConfigError> {
    if fraction.is_finite() && fraction > 0.0 && fraction <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange(fraction))
    }
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub starting_cash: f64,
    pub commission_rate: f64,
    pub fill_timing: FillTiming,
    pub strategy: StrategyParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_cash: 100_000.0,
            commission_rate: 0.001,
            fill_timing: FillTiming::SameBarClose,
            strategy: StrategyParams::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(starting_cash: f64, commission_rate: f64, strategy: StrategyParams) -> Self {
        Self {
            starting_cash,
            commission_rate,
            fill_timing: FillTiming::SameBarClose,
            strategy,
        }
    }

    pub fn with_fill_timing(mut self, fill_timing: FillTiming) -> Self {
        self.fill_timing = fill_timing;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.starting_cash.is_finite() && self.starting_cash > 0.0) {
            return Err(ConfigError::NonPositiveCash(self.starting_cash));
        }
        if !(self.commission_rate.is_finite()
            && self.commission_rate >= 0.0
            && self.commission_rate < 1.0)
        {
            return Err(ConfigError::CommissionOutOfRange(self.commission_rate));
        }
        self.strategy.validate()
    }
}
