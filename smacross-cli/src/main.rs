//! smacross CLI: run, download and sweep commands.
//!
//! Commands:
//! - `run`: backtest the SMA crossover strategy on one symbol
//! - `download`: fetch daily bars from Yahoo Finance into a CSV file
//! - `sweep`: run a (fast, slow) period grid in parallel and rank the results

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use smacross_core::data::{write_bars_csv, BarSource, YahooBarSource};
use smacross_core::domain::BarSeries;
use smacross_core::FillTiming;
use smacross_runner::{
    best_row, load_bars, run_single_backtest, run_sweep, save_artifacts, BacktestResult,
    ParamGrid, RunConfig, SweepRow,
};

#[derive(Parser)]
#[command(name = "smacross", about = "SMA crossover backtester")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest the strategy and print the starting and final portfolio value.
    Run {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Write manifest.json, trades.csv, round_trips.csv and equity.csv here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Download daily bars from Yahoo Finance and save them as CSV.
    Download {
        /// Ticker symbol.
        #[arg(long, default_value = "TSLA")]
        symbol: String,

        /// Output CSV path.
        #[arg(long, default_value = "tsla.csv")]
        csv: PathBuf,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01", value_parser = parse_date)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD), exclusive. Defaults to today.
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Retries after a failed request; the wait doubles from 500ms.
        #[arg(long, default_value_t = 3)]
        retries: u32,
    },
    /// Run every (fast, slow) pair of a period grid over the same bars.
    Sweep {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Fast periods, comma separated.
        #[arg(long = "fast-grid", value_delimiter = ',', default_values_t = [5usize, 10, 15, 20])]
        fast_periods: Vec<usize>,

        /// Slow periods, comma separated.
        #[arg(long = "slow-grid", value_delimiter = ',', default_values_t = [20usize, 30, 40, 50, 60])]
        slow_periods: Vec<usize>,

        /// Print rows as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Flags layered over the TOML config (or the defaults when no file is given).
#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticker symbol to download.
    #[arg(long)]
    symbol: Option<String>,

    /// CSV file to read from, or write to after a download.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Use the CSV file if it exists instead of downloading.
    #[arg(long, default_value_t = false)]
    no_download: bool,

    /// Start date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), exclusive. Defaults to today.
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// Fraction of equity committed per entry.
    #[arg(long)]
    pct: Option<f64>,

    /// Starting cash.
    #[arg(long)]
    cash: Option<f64>,

    /// Commission rate per trade value.
    #[arg(long)]
    commission: Option<f64>,

    /// Fast SMA period.
    #[arg(long)]
    fast: Option<usize>,

    /// Slow SMA period.
    #[arg(long)]
    slow: Option<usize>,

    /// When orders fill: same-bar-close or next-bar-open.
    #[arg(long, value_parser = parse_fill_timing)]
    fill_timing: Option<FillTiming>,
}

impl ConfigOverrides {
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut RunConfig) {
        if let Some(symbol) = &self.symbol {
            config.data.symbol = symbol.clone();
        }
        if let Some(csv) = &self.csv {
            config.data.csv = csv.clone();
        }
        if self.no_download {
            config.data.download = false;
        }
        if let Some(start) = self.start {
            config.data.start = start;
        }
        if self.end.is_some() {
            config.data.end = self.end;
        }
        if let Some(pct) = self.pct {
            config.strategy.fraction = pct;
        }
        if let Some(fast) = self.fast {
            config.strategy.fast_period = fast;
        }
        if let Some(slow) = self.slow {
            config.strategy.slow_period = slow;
        }
        if let Some(cash) = self.cash {
            config.broker.cash = cash;
        }
        if let Some(commission) = self.commission {
            config.broker.commission = commission;
        }
        if let Some(fill_timing) = self.fill_timing {
            config.broker.fill_timing = fill_timing;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            overrides,
            output_dir,
        } => run_backtest_cmd(&overrides, output_dir),
        Commands::Download {
            symbol,
            csv,
            start,
            end,
            retries,
        } => run_download(&symbol, csv, start, end, retries),
        Commands::Sweep {
            overrides,
            fast_periods,
            slow_periods,
            json,
        } => run_sweep_cmd(&overrides, ParamGrid::new(fast_periods, slow_periods), json),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_backtest_cmd(overrides: &ConfigOverrides, output_dir: Option<PathBuf>) -> Result<()> {
    let config = overrides.resolve()?;
    let result = run_single_backtest(&config)?;

    println!(
        "Starting Portfolio Value: {}",
        format_money(result.run.starting_value)
    );
    println!(
        "Final   Portfolio Value: {}",
        format_money(result.run.final_equity)
    );
    print_summary(&result);

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&result, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_download(
    symbol: &str,
    csv: PathBuf,
    start: NaiveDate,
    end: Option<NaiveDate>,
    retries: u32,
) -> Result<()> {
    let end = end.unwrap_or_else(|| chrono::Local::now().date_naive());
    let source =
        YahooBarSource::new(symbol, start, end)?.with_retries(retries, Duration::from_millis(500));
    let bars = source
        .load()
        .with_context(|| format!("failed to download {symbol}"))?;
    write_bars_csv(&csv, &bars)?;
    info!(symbol, bars = bars.len(), path = %csv.display(), "download complete");
    println!("Saved {} bars for {symbol} to {}", bars.len(), csv.display());
    Ok(())
}

fn run_sweep_cmd(overrides: &ConfigOverrides, grid: ParamGrid, json: bool) -> Result<()> {
    let config = overrides.resolve()?;
    config.validate()?;
    let loaded = load_bars(&config)?;
    let series = BarSeries::new(loaded.bars).context("loaded bars are not a valid series")?;
    let rows = run_sweep(&series, &config.engine_config(), &grid)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    print_sweep_table(&config.data.symbol, &rows);
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let run = &result.run;
    let metrics = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Run ID:         {}", result.fingerprint.run_id.short());
    if let (Some(first), Some(last)) = (result.fingerprint.first_bar, result.fingerprint.last_bar) {
        println!("Period:         {} to {}", first.date(), last.date());
    }
    println!("Bars:           {}", run.bar_count);
    if run.insufficient_data {
        println!("WARNING: fewer bars than the slow period; no trades possible");
    }
    println!("Trades:         {}", metrics.trade_count);
    println!("Round Trips:    {}", metrics.round_trip_count);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", metrics.total_return * 100.0);
    println!("CAGR:           {:.2}%", metrics.cagr * 100.0);
    println!("Sharpe:         {:.3}", metrics.sharpe);
    println!("Max Drawdown:   {:.2}%", metrics.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", metrics.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", metrics.profit_factor);
    println!("Exposure:       {:.1}%", metrics.exposure * 100.0);
    println!("Commission:     {}", format_money(metrics.total_commission));
    if run.zero_size_skips > 0 || run.dropped_orders > 0 {
        println!(
            "Skipped:        {} zero-size entries, {} dropped orders",
            run.zero_size_skips, run.dropped_orders
        );
    }
    println!();
}

fn print_sweep_table(symbol: &str, rows: &[SweepRow]) {
    println!("Sweep: {symbol} ({} pairs)", rows.len());
    println!(
        "{:>5} {:>5} {:>16} {:>10} {:>10} {:>7}",
        "Fast", "Slow", "Final Value", "Return", "Max DD", "Trades"
    );
    println!("{}", "-".repeat(58));
    for row in rows {
        println!(
            "{:>5} {:>5} {:>16} {:>9.2}% {:>9.2}% {:>7}",
            row.fast_period,
            row.slow_period,
            format_money(row.final_equity),
            row.metrics.total_return * 100.0,
            row.metrics.max_drawdown * 100.0,
            row.metrics.trade_count
        );
    }
    if let Some(best) = best_row(rows) {
        println!();
        println!(
            "Best: fast={} slow={} final value {}",
            best.fast_period,
            best.slow_period,
            format_money(best.final_equity)
        );
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_fill_timing(s: &str) -> Result<FillTiming, String> {
    match s.replace('_', "-").as_str() {
        "same-bar-close" | "close" => Ok(FillTiming::SameBarClose),
        "next-bar-open" | "open" => Ok(FillTiming::NextBarOpen),
        other => Err(format!(
            "unknown fill timing '{other}'. Valid: same-bar-close, next-bar-open"
        )),
    }
}

/// Two decimals with comma thousands separators: `100,000.00`.
fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}
