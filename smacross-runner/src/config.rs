//! TOML run configuration.
//!
//! ```toml
//! [data]
//! symbol = "TSLA"
//! csv = "tsla.csv"
//! download = true
//! start = "2020-01-01"
//! # end (exclusive) defaults to today
//!
//! [strategy]
//! fast_period = 10
//! slow_period = 30
//! fraction = 0.95
//!
//! [broker]
//! cash = 100000.0
//! commission = 0.001
//! fill_timing = "same_bar_close"
//! ```
//!
//! Every field has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smacross_core::{EngineConfig, FillTiming, StrategyParams};

/// Errors from loading a run config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid engine parameters: {0}")]
    Engine(#[from] smacross_core::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub symbol: String,
    /// CSV file read from, and written to after a download.
    pub csv: PathBuf,
    /// Download even when the CSV file already exists.
    pub download: bool,
    pub start: NaiveDate,
    /// Exclusive end date, as yfinance treats it. `None` means today, so an
    /// unfinished session for today is never downloaded.
    pub end: Option<NaiveDate>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            symbol: "TSLA".into(),
            csv: PathBuf::from("tsla.csv"),
            download: true,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub fast_period: usize,
    pub slow_period: usize,
    pub fraction: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
            fraction: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSection {
    pub cash: f64,
    pub commission: f64,
    pub fill_timing: FillTiming,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            cash: 100_000.0,
            commission: 0.001,
            fill_timing: FillTiming::SameBarClose,
        }
    }
}

/// Complete configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataSection,
    pub strategy: StrategySection,
    pub broker: BrokerSection,
}

impl RunConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn strategy_params(&self) -> StrategyParams {
        StrategyParams::new(
            self.strategy.fast_period,
            self.strategy.slow_period,
            self.strategy.fraction,
        )
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(
            self.broker.cash,
            self.broker.commission,
            self.strategy_params(),
        )
        .with_fill_timing(self.broker.fill_timing)
    }

    /// Resolved end date: the configured one, or today.
    pub fn end_date(&self) -> NaiveDate {
        self.data
            .end
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Check the date range and every engine parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let end = self.end_date();
        if self.data.start >= end {
            return Err(ConfigError::InvalidDateRange {
                start: self.data.start,
                end,
            });
        }
        self.engine_config().validate()?;
        Ok(())
    }
}
