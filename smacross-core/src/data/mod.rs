//! Data sources: CSV files and Yahoo Finance downloads.

pub mod csv_file;
pub mod provider;
pub mod yahoo;

pub use csv_file::{parse_timestamp, read_bars, write_bars, write_bars_csv, CsvBarSource};
pub use provider::{BarSource, DataError, DataSource, InMemorySource};
pub use yahoo::YahooBarSource;
