//! Bar, the fundamental market data unit, and the validated bar sequence.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for the single traded instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns the name of the first OHLC field that is NaN, infinite, or <= 0.
    fn first_bad_price(&self) -> Option<(&'static str, f64)> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v <= 0.0)
    }
}

/// Why a bar sequence was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index}: timestamp {timestamp} is not after previous bar {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("bar {index} ({timestamp}): {field} price {value} must be finite and positive")]
    NonPositivePrice {
        index: usize,
        timestamp: NaiveDateTime,
        field: &'static str,
        value: f64,
    },
}

/// Ordered, immutable bar sequence.
///
/// Construction validates the whole input up front, so a run over a `BarSeries`
/// never starts on data that would fail halfway through.
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        for (index, bar) in bars.iter().enumerate() {
            if let Some((field, value)) = bar.first_bad_price() {
                return Err(BarError::NonPositivePrice {
                    index,
                    timestamp: bar.timestamp,
                    field,
                    value,
                });
            }
            if index > 0 {
                let previous = bars[index - 1].timestamp;
                if bar.timestamp <= previous {
                    return Err(BarError::NonIncreasingTimestamp {
                        index,
                        timestamp: bar.timestamp,
                        previous,
                    });
                }
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn into_inner(self) -> Vec<Bar> {
        self.bars
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
