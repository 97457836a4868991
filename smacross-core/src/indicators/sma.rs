//! Simple Moving Average (SMA).
//!
//! Streaming mean of close prices over a trailing window. Undefined until
//! `period` prices have been observed; afterwards each observation is O(1)
//! (running sum, oldest value evicted).

use std::collections::VecDeque;

use crate::config::ConfigError;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::NonPositivePeriod { name: "sma" });
        }
        Ok(Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            name: format!("sma_{period}"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Feed the next price; returns the average once the window is full.
    pub fn observe(&mut self, price: f64) -> Option<f64> {
        if self.window.len() == self.period {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        self.window.push_back(price);
        self.sum += price;
        self.value()
    }

    /// Current average without feeding a new price.
    pub fn value(&self) -> Option<f64> {
        if self.is_ready() {
            Some(self.sum / self.period as f64)
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.window.len() == self.period
    }

    /// Observations still needed before the first defined value.
    pub fn bars_until_ready(&self) -> usize {
        self.period - self.window.len()
    }
}
