//! Yahoo Finance bar source.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API with retries and
//! exponential backoff. Prices are split/dividend adjusted: when the response
//! carries adjusted closes, open/high/low/close are scaled by `adjclose / close`.
//!
//! The chart endpoint is unofficial and its layout can change without notice;
//! decoding failures surface as `DataError::ResponseFormatChanged`.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{BarSource, DataError, DataSource};
use crate::domain::Bar;

const CHART_ENDPOINT: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Used when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartSeries>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    timestamp: Option<Vec<i64>>,
    indicators: SeriesIndicators,
}

#[derive(Debug, Deserialize)]
struct SeriesIndicators {
    quote: Vec<QuoteColumns>,
    adjclose: Option<Vec<AdjCloseColumn>>,
}

/// Column-major OHLCV. Holidays and halted sessions come back as nulls.
#[derive(Debug, Deserialize)]
struct QuoteColumns {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseColumn {
    adjclose: Vec<Option<f64>>,
}

fn format_changed(what: impl Into<String>) -> DataError {
    DataError::ResponseFormatChanged(what.into())
}

impl ChartResponse {
    /// The single series for the requested symbol, or the error Yahoo reported.
    fn into_series(self, symbol: &str) -> Result<ChartSeries, DataError> {
        match (self.chart.result, self.chart.error) {
            (Some(series), _) => series
                .into_iter()
                .next()
                .ok_or_else(|| format_changed("result array is empty")),
            (None, Some(err)) if err.code == "Not Found" => Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
            (None, Some(err)) => Err(format_changed(format!("{}: {}", err.code, err.description))),
            (None, None) => Err(format_changed("neither result nor error present")),
        }
    }
}

impl QuoteColumns {
    /// Open, high, low and close for row `i`, if all four are present.
    fn prices(&self, i: usize) -> Option<[f64; 4]> {
        Some([
            cell(&self.open, i)?,
            cell(&self.high, i)?,
            cell(&self.low, i)?,
            cell(&self.close, i)?,
        ])
    }

    fn volume(&self, i: usize) -> f64 {
        self.volume.get(i).copied().flatten().unwrap_or(0) as f64
    }
}

fn cell(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

impl ChartSeries {
    /// Convert to adjusted daily bars stamped at midnight. Returns the bars and
    /// the number of rows skipped for missing prices.
    fn into_bars(self) -> Result<(Vec<Bar>, usize), DataError> {
        let timestamps = self.timestamp.ok_or_else(|| format_changed("no timestamps"))?;
        let SeriesIndicators { quote, adjclose } = self.indicators;
        let quote = quote
            .into_iter()
            .next()
            .ok_or_else(|| format_changed("no quote data"))?;
        let adjusted: Vec<Option<f64>> = adjclose
            .and_then(|cols| cols.into_iter().next())
            .map(|col| col.adjclose)
            .unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        let mut skipped = 0usize;
        for (i, &secs) in timestamps.iter().enumerate() {
            let day = chrono::DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| format_changed(format!("timestamp out of range: {secs}")))?;

            let Some([open, high, low, close]) = quote.prices(i) else {
                skipped += 1;
                continue;
            };

            // Scale every price so the close matches the adjusted close.
            let factor = match adjusted.get(i).copied().flatten() {
                Some(adj) if adj > 0.0 && close > 0.0 => adj / close,
                _ => 1.0,
            };
            bars.push(Bar::new(
                day.and_time(NaiveTime::MIN),
                open * factor,
                high * factor,
                low * factor,
                close * factor,
                quote.volume(i),
            ));
        }
        Ok((bars, skipped))
    }
}

/// The backoff delay, stretched to the server's `Retry-After` after a 429.
fn wait_before_retry(err: &DataError, backoff: Duration) -> Duration {
    match err {
        DataError::RateLimited { retry_after_secs } => {
            backoff.max(Duration::from_secs(*retry_after_secs))
        }
        _ => backoff,
    }
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(Result<Vec<Bar>, DataError>),
    Retry(DataError),
}

/// Daily bars for one symbol over `[start, end)`.
pub struct YahooBarSource {
    client: reqwest::blocking::Client,
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooBarSource {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self, DataError> {
        if start >= end {
            return Err(DataError::InvalidRange { start, end });
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            symbol: symbol.into(),
            start,
            end,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Override the retry count and the first backoff delay (doubled per retry).
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// `period2` is midnight at the start of `end`, so the end day itself is
    /// excluded and a still-open session for today is never fetched.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        format!(
            "{CHART_ENDPOINT}/{symbol}?period1={period1}&period2={period2}\
             &interval=1d&includeAdjustedClose=true"
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let (bars, skipped) = resp.into_series(symbol)?.into_bars()?;
        if skipped > 0 {
            debug!(symbol, skipped, "skipped rows with missing prices");
        }
        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }

    fn attempt(&self, url: &str) -> Attempt {
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Attempt::Retry(DataError::NetworkUnreachable(e.to_string()))
            }
            Err(e) => return Attempt::Done(Err(DataError::NetworkUnreachable(e.to_string()))),
        };

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                warn!(symbol = %self.symbol, retry_after_secs, "rate limited by Yahoo");
                Attempt::Retry(DataError::RateLimited { retry_after_secs })
            }
            reqwest::StatusCode::NOT_FOUND => Attempt::Done(Err(DataError::SymbolNotFound {
                symbol: self.symbol.clone(),
            })),
            status if !status.is_success() => {
                Attempt::Retry(DataError::Other(format!("HTTP {status} for {}", self.symbol)))
            }
            _ => Attempt::Done(
                resp.json::<ChartResponse>()
                    .map_err(|e| format_changed(format!("undecodable chart for {}: {e}", self.symbol)))
                    .and_then(|chart| Self::parse_response(&self.symbol, chart)),
            ),
        }
    }

    fn fetch_with_retry(&self) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(&self.symbol, self.start, self.end);
        let mut delay = self.base_delay;
        let mut attempts_left = self.max_retries;

        loop {
            match self.attempt(&url) {
                Attempt::Done(result) => return result,
                Attempt::Retry(err) if attempts_left == 0 => return Err(err),
                Attempt::Retry(err) => {
                    let wait = wait_before_retry(&err, delay);
                    debug!(symbol = %self.symbol, error = %err, ?wait, attempts_left, "retrying");
                    std::thread::sleep(wait);
                    delay *= 2;
                    attempts_left -= 1;
                }
            }
        }
    }
}

impl BarSource for YahooBarSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn kind(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn load(&self) -> Result<Vec<Bar>, DataError> {
        let bars = self.fetch_with_retry()?;
        debug!(symbol = %self.symbol, bars = bars.len(), "downloaded bars");
        Ok(bars)
    }
}
