//! Bar source trait and structured error types.
//!
//! The BarSource trait abstracts over where bars come from (a CSV file, Yahoo
//! Finance, an in-memory fixture) so the runner can swap implementations and
//! tests can avoid the network.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("row {row}: cannot parse {column} value '{value}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("data error: {0}")]
    Other(String),
}

/// Where the bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvFile,
    InMemory,
}

/// A source of daily bars for one instrument.
///
/// Implementations return bars in the order the source holds them; validation
/// (monotonic timestamps, positive prices) happens in `BarSeries::new`.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn kind(&self) -> DataSource;

    fn load(&self) -> Result<Vec<Bar>, DataError>;
}

/// Bars already in memory. Used by tests and benches.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    bars: Vec<Bar>,
}

impl InMemorySource {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }
}

impl BarSource for InMemorySource {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn kind(&self) -> DataSource {
        DataSource::InMemory
    }

    fn load(&self) -> Result<Vec<Bar>, DataError> {
        Ok(self.bars.clone())
    }
}
