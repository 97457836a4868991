//! CSV bar files.
//!
//! Reads the layout pandas/yfinance writes with `to_csv`: a date column
//! (`Date` or `Datetime`) followed by price columns in any order, e.g.
//! `Date,Close,High,Low,Open,Volume`. Column names are case-insensitive and an
//! optional `Adj Close` column is ignored.
//!
//! Rows whose price cells are empty are skipped (yfinance writes blanks for
//! non-trading days when frames are joined).

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use tracing::debug;

use super::provider::{BarSource, DataError, DataSource};
use crate::domain::Bar;

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn require_column(
    headers: &StringRecord,
    names: &[&str],
    label: &'static str,
) -> Result<usize, DataError> {
    find_column(headers, names).ok_or(DataError::MissingColumn(label))
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, DataError> {
        Ok(Self {
            timestamp: require_column(headers, &["date", "datetime", "timestamp"], "date")?,
            open: require_column(headers, &["open"], "open")?,
            high: require_column(headers, &["high"], "high")?,
            low: require_column(headers, &["low"], "low")?,
            close: require_column(headers, &["close"], "close")?,
            volume: find_column(headers, &["volume"]),
        })
    }
}

/// Parse a date cell. Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, the `T`
/// separated form, and either datetime form with a UTC offset (the offset is
/// dropped; the local wall-clock time is kept).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(ts);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%:z"] {
        if let Ok(ts) = DateTime::parse_from_str(value, fmt) {
            return Some(ts.naive_local());
        }
    }
    None
}

/// Format a timestamp the way `write_bars_csv` stores it: date only at midnight.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn parse_price(
    record: &StringRecord,
    index: usize,
    row: usize,
    column: &'static str,
) -> Result<Option<f64>, DataError> {
    let cell = record.get(index).unwrap_or("").trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::InvalidNumber {
            row,
            column,
            value: cell.to_string(),
        })
}

/// Read bars from any CSV reader.
pub fn read_bars<R: std::io::Read>(reader: R) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::resolve(rdr.headers()?)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // 1-based, counting the header as row 1.
        let row = i + 2;

        let raw_ts = record.get(columns.timestamp).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DataError::InvalidTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        let open = parse_price(&record, columns.open, row, "open")?;
        let high = parse_price(&record, columns.high, row, "high")?;
        let low = parse_price(&record, columns.low, row, "low")?;
        let close = parse_price(&record, columns.close, row, "close")?;
        let volume = match columns.volume {
            Some(idx) => parse_price(&record, idx, row, "volume")?.unwrap_or(0.0),
            None => 0.0,
        };

        match (open, high, low, close) {
            (Some(open), Some(high), Some(low), Some(close)) => {
                bars.push(Bar::new(timestamp, open, high, low, close, volume));
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "skipped CSV rows with empty prices");
    }
    Ok(bars)
}

/// Write bars as `Date,Open,High,Low,Close,Volume`.
pub fn write_bars<W: std::io::Write>(writer: W, bars: &[Bar]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])?;
    for bar in bars {
        wtr.write_record([
            format_timestamp(&bar.timestamp),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    wtr.flush().map_err(|e| DataError::Io {
        path: "<writer>".into(),
        source: e,
    })?;
    Ok(())
}

/// Persist bars to `path`, creating parent directories.
pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let io_err = |source| DataError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = std::fs::File::create(path).map_err(io_err)?;
    write_bars(file, bars)
}

/// Bars loaded from a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    path: PathBuf,
}

impl CsvBarSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn kind(&self) -> DataSource {
        DataSource::CsvFile
    }

    fn load(&self) -> Result<Vec<Bar>, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|source| DataError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let bars = read_bars(file)?;
        debug!(path = %self.path.display(), bars = bars.len(), "loaded CSV");
        Ok(bars)
    }
}
