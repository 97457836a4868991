//! Run artifacts: a versioned JSON manifest plus CSV tapes of the trade log,
//! round trips and equity curve for plotting elsewhere.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use smacross_core::data::csv_file::format_timestamp;
use smacross_core::domain::{EquityPoint, TradeLogEntry};

use crate::metrics::RoundTrip;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Pretty JSON manifest.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to encode run manifest")
}

/// Parse a manifest written by [`export_json`]. Manifests from a newer schema
/// are refused rather than half-read.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult = serde_json::from_str(json).context("failed to decode run manifest")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (this build reads up to {SCHEMA_VERSION})",
            result.schema_version
        );
    }
    Ok(result)
}

/// Render a header plus rows into an in-memory CSV document.
fn csv_document<I>(header: &[&str], rows: I) -> Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer.into_inner().context("CSV writer failed to flush")?;
    String::from_utf8(bytes).context("CSV writer produced invalid UTF-8")
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn price(value: f64) -> String {
    format!("{value:.6}")
}

/// Columns: timestamp, side, size, price, commission, resulting_cash
pub fn export_trades_csv(trades: &[TradeLogEntry]) -> Result<String> {
    csv_document(
        &["timestamp", "side", "size", "price", "commission", "resulting_cash"],
        trades.iter().map(|t| {
            vec![
                format_timestamp(&t.timestamp),
                t.side.to_string(),
                t.size.to_string(),
                price(t.price),
                money(t.commission),
                money(t.resulting_cash),
            ]
        }),
    )
}

pub fn export_round_trips_csv(trips: &[RoundTrip]) -> Result<String> {
    csv_document(
        &[
            "entry_time",
            "exit_time",
            "size",
            "entry_price",
            "exit_price",
            "gross_pnl",
            "commission",
            "net_pnl",
            "return_pct",
        ],
        trips.iter().map(|t| {
            vec![
                format_timestamp(&t.entry_time),
                format_timestamp(&t.exit_time),
                t.size.to_string(),
                price(t.entry_price),
                price(t.exit_price),
                money(t.gross_pnl),
                money(t.commission),
                money(t.net_pnl),
                format!("{:.4}", t.return_pct() * 100.0),
            ]
        }),
    )
}

pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    csv_document(
        &["timestamp", "equity"],
        equity_curve
            .iter()
            .map(|p| vec![format_timestamp(&p.timestamp), money(p.equity)]),
    )
}

/// Write `manifest.json`, `trades.csv`, `round_trips.csv` and `equity.csv`
/// into a fresh `{symbol}_{YYYYMMDD_HHMMSS}` directory under `output_dir`.
/// Returns that directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let run_dir = output_dir.join(format!("{}_{stamp}", result.symbol));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("cannot create {}", run_dir.display()))?;

    let files = [
        ("manifest.json", export_json(result)?),
        ("trades.csv", export_trades_csv(&result.run.trade_log)?),
        ("round_trips.csv", export_round_trips_csv(&result.round_trips)?),
        ("equity.csv", export_equity_csv(&result.run.equity_curve)?),
    ];
    for (name, contents) in &files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents).with_context(|| format!("cannot write {}", path.display()))?;
    }

    tracing::info!(dir = %run_dir.display(), files = files.len(), "saved artifacts");
    Ok(run_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use smacross_core::domain::OrderSide;

    fn entry(side: OrderSide) -> TradeLogEntry {
        TradeLogEntry {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            side,
            size: 90,
            price: 11.0,
            commission: 0.99,
            resulting_cash: 9.01,
        }
    }

    #[test]
    fn trades_csv_has_header_and_rows() {
        let csv = export_trades_csv(&[entry(OrderSide::Buy), entry(OrderSide::Sell)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,side,size,price,commission,resulting_cash");
        assert_eq!(lines[1], "2024-01-05,BUY,90,11.000000,0.99,9.01");
        assert!(lines[2].contains(",SELL,"));
    }

    #[test]
    fn equity_csv_formats_two_decimals() {
        let point = EquityPoint {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            equity: 1_234.5678,
        };
        let csv = export_equity_csv(&[point]).unwrap();
        assert_eq!(csv, "timestamp,equity\n2024-01-05,1234.57\n");
    }

    #[test]
    fn empty_round_trips_still_write_header() {
        let csv = export_round_trips_csv(&[]).unwrap();
        assert!(csv.starts_with("entry_time,exit_time,size"));
        assert_eq!(csv.lines().count(), 1);
    }
}
