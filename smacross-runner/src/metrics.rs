//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! No dependencies on the runner, data sources, or engine internals.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use smacross_core::domain::{EquityPoint, OrderSide, TradeLogEntry};
use smacross_core::RunResult;

/// A BUY paired with its closing SELL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub size: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub gross_pnl: f64,
    /// Commission on both legs.
    pub commission: f64,
    pub net_pnl: f64,
}

impl RoundTrip {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn return_pct(&self) -> f64 {
        let cost = self.size as f64 * self.entry_price;
        if cost > 0.0 {
            self.net_pnl / cost
        } else {
            0.0
        }
    }
}

/// Pair each BUY with the next SELL. A trailing unmatched BUY (position still
/// open at the end) is not a round trip.
pub fn extract_round_trips(trade_log: &[TradeLogEntry]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<&TradeLogEntry> = None;

    for entry in trade_log {
        match (entry.side, open) {
            (OrderSide::Buy, _) => open = Some(entry),
            (OrderSide::Sell, Some(buy)) => {
                let gross_pnl = (entry.price - buy.price) * entry.size as f64;
                let commission = buy.commission + entry.commission;
                trips.push(RoundTrip {
                    entry_time: buy.timestamp,
                    exit_time: entry.timestamp,
                    size: entry.size,
                    entry_price: buy.price,
                    exit_price: entry.price,
                    gross_pnl,
                    commission,
                    net_pnl: gross_pnl - commission,
                });
                open = None;
            }
            (OrderSide::Sell, None) => {}
        }
    }
    trips
}

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub round_trip_count: usize,
    pub total_commission: f64,
    pub exposure: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from a finished run.
    pub fn compute(result: &RunResult) -> Self {
        let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
        let trips = extract_round_trips(&result.trade_log);
        Self {
            total_return: total_return(result.starting_value, result.final_equity),
            cagr: cagr(result.starting_value, result.final_equity, equity.len()),
            sharpe: sharpe_ratio(&equity),
            max_drawdown: max_drawdown(&equity),
            win_rate: win_rate(&trips),
            profit_factor: profit_factor(&trips),
            trade_count: result.trade_log.len(),
            round_trip_count: trips.len(),
            total_commission: result.total_commission,
            exposure: exposure(&result.equity_curve, &result.trade_log),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial
}

/// Compound Annual Growth Rate.
///
/// Assumes 252 trading days per year. Returns 0.0 for fewer than 2 bars.
pub fn cagr(initial: f64, final_equity: f64, trading_days: usize) -> f64 {
    if trading_days < 2 || initial <= 0.0 || final_equity <= 0.0 {
        return 0.0;
    }
    let years = trading_days as f64 / 252.0;
    (final_equity / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio from bar-to-bar returns, zero risk-free rate.
///
/// Returns 0.0 if variance is zero or there are fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * (252.0_f64).sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = match equity_curve.first() {
        Some(&first) => first,
        None => return 0.0,
    };
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Win rate: fraction of round trips with positive net PnL.
pub fn win_rate(trips: &[RoundTrip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    let winners = trips.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trips.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trips: &[RoundTrip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trips.iter().filter(|t| t.net_pnl > 0.0).map(|t| t.net_pnl).sum();
    let gross_loss: f64 = trips
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Fraction of bars that end with an open position.
///
/// A bar counts when its timestamp is at or after a BUY and before the
/// matching SELL, so the entry bar is exposed and the exit bar is not.
pub fn exposure(equity_curve: &[EquityPoint], trade_log: &[TradeLogEntry]) -> f64 {
    if equity_curve.is_empty() {
        return 0.0;
    }
    let mut fills = trade_log.iter().peekable();
    let mut long = false;
    let mut exposed = 0usize;

    for point in equity_curve {
        while let Some(entry) = fills.next_if(|e| e.timestamp <= point.timestamp) {
            long = entry.side == OrderSide::Buy;
        }
        if long {
            exposed += 1;
        }
    }
    exposed as f64 / equity_curve.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn fill(day: u32, side: OrderSide, size: u64, price: f64, commission: f64) -> TradeLogEntry {
        TradeLogEntry {
            timestamp: ts(day),
            side,
            size,
            price,
            commission,
            resulting_cash: 0.0,
        }
    }

    #[test]
    fn round_trips_pair_buys_with_sells() {
        let log = vec![
            fill(2, OrderSide::Buy, 10, 100.0, 1.0),
            fill(5, OrderSide::Sell, 10, 110.0, 1.1),
            fill(8, OrderSide::Buy, 5, 120.0, 0.6),
            fill(9, OrderSide::Sell, 5, 100.0, 0.5),
            fill(12, OrderSide::Buy, 7, 90.0, 0.63),
        ];
        let trips = extract_round_trips(&log);

        assert_eq!(trips.len(), 2);
        assert!((trips[0].gross_pnl - 100.0).abs() < 1e-9);
        assert!((trips[0].net_pnl - 97.9).abs() < 1e-9);
        assert!(trips[0].is_winner());
        assert!((trips[1].net_pnl - (-101.1)).abs() < 1e-9);
        assert_eq!(trips[1].exit_time, ts(9));
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let log = vec![
            fill(2, OrderSide::Buy, 10, 100.0, 0.0),
            fill(3, OrderSide::Sell, 10, 130.0, 0.0),
            fill(4, OrderSide::Buy, 10, 100.0, 0.0),
            fill(5, OrderSide::Sell, 10, 90.0, 0.0),
        ];
        let trips = extract_round_trips(&log);
        assert_eq!(win_rate(&trips), 0.5);
        assert!((profit_factor(&trips) - 3.0).abs() < 1e-12);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn max_drawdown_is_negative_fraction() {
        assert!((max_drawdown(&[100.0, 120.0, 90.0, 130.0]) - (-0.25)).abs() < 1e-12);
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn total_return_and_cagr() {
        assert!((total_return(1_000.0, 1_500.0) - 0.5).abs() < 1e-12);
        // Doubling over exactly one year of bars.
        assert!((cagr(1_000.0, 2_000.0, 252) - 1.0).abs() < 1e-12);
        assert_eq!(cagr(1_000.0, 2_000.0, 1), 0.0);
    }

    #[test]
    fn sharpe_is_zero_for_flat_equity() {
        assert_eq!(sharpe_ratio(&[100.0; 50]), 0.0);
        assert!(sharpe_ratio(&[100.0, 101.0, 103.0, 102.5, 104.0]) > 0.0);
    }

    #[test]
    fn exposure_counts_entry_bar_not_exit_bar() {
        let curve: Vec<EquityPoint> = (1..=10)
            .map(|d| EquityPoint {
                timestamp: ts(d),
                equity: 1_000.0,
            })
            .collect();
        let log = vec![
            fill(3, OrderSide::Buy, 1, 10.0, 0.0),
            fill(6, OrderSide::Sell, 1, 10.0, 0.0),
            fill(9, OrderSide::Buy, 1, 10.0, 0.0),
        ];
        // Long on days 3, 4, 5, 9, 10.
        assert!((exposure(&curve, &log) - 0.5).abs() < 1e-12);
        assert_eq!(exposure(&[], &log), 0.0);
    }
}
