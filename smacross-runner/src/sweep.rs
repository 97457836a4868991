//! Parameter sweep over a (fast, slow) period grid.
//!
//! Every grid point is an independent backtest over the same bars, so runs are
//! spread across rayon's thread pool with no shared state. Results come back
//! sorted by (fast, slow) regardless of scheduling.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use smacross_core::domain::BarSeries;
use smacross_core::engine::{run_backtest, BacktestError};
use smacross_core::{EngineConfig, StrategyParams};

use crate::metrics::PerformanceMetrics;

/// Fast and slow period lists to cross.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
}

impl ParamGrid {
    pub fn new(fast_periods: Vec<usize>, slow_periods: Vec<usize>) -> Self {
        Self {
            fast_periods,
            slow_periods,
        }
    }

    /// Fast 5..=20 step 5, slow 20..=60 step 10.
    pub fn default_grid() -> Self {
        Self {
            fast_periods: vec![5, 10, 15, 20],
            slow_periods: vec![20, 30, 40, 50, 60],
        }
    }

    /// All (fast, slow) pairs with fast < slow, in (fast, slow) order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self
            .fast_periods
            .iter()
            .flat_map(|&fast| self.slow_periods.iter().map(move |&slow| (fast, slow)))
            .filter(|&(fast, slow)| fast < slow)
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}

/// One grid point's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub fast_period: usize,
    pub slow_period: usize,
    pub final_equity: f64,
    pub metrics: PerformanceMetrics,
}

/// Run every valid grid point against `bars`, varying only the periods of `base`.
pub fn run_sweep(
    bars: &BarSeries,
    base: &EngineConfig,
    grid: &ParamGrid,
) -> Result<Vec<SweepRow>, BacktestError> {
    let pairs = grid.pairs();
    debug!(points = pairs.len(), "running parameter sweep");

    let mut rows = pairs
        .par_iter()
        .map(|&(fast, slow)| {
            let mut config = base.clone();
            config.strategy = StrategyParams::new(fast, slow, base.strategy.fraction);
            let run = run_backtest(bars, &config)?;
            Ok(SweepRow {
                fast_period: fast,
                slow_period: slow,
                final_equity: run.final_equity,
                metrics: PerformanceMetrics::compute(&run),
            })
        })
        .collect::<Result<Vec<_>, BacktestError>>()?;

    rows.sort_by_key(|row| (row.fast_period, row.slow_period));
    Ok(rows)
}

/// Row with the highest final equity; ties go to the earlier (fast, slow).
pub fn best_row(rows: &[SweepRow]) -> Option<&SweepRow> {
    rows.iter().fold(None, |best: Option<&SweepRow>, row| match best {
        Some(b) if b.final_equity >= row.final_equity => Some(b),
        _ => Some(row),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_skip_fast_not_below_slow() {
        let grid = ParamGrid::new(vec![20, 5, 30], vec![10, 30]);
        assert_eq!(grid.pairs(), vec![(5, 10), (5, 30), (20, 30)]);
    }

    #[test]
    fn default_grid_has_no_invalid_pairs() {
        let pairs = ParamGrid::default_grid().pairs();
        assert!(pairs.iter().all(|(f, s)| f < s));
        // (20, 20) is dropped.
        assert_eq!(pairs.len(), 4 * 5 - 1);
    }

    #[test]
    fn best_row_prefers_first_on_ties() {
        let metrics = PerformanceMetrics {
            total_return: 0.0,
            cagr: 0.0,
            sharpe: 0.0,
            max_drawdown: 0.0,
            win_rate: 0.0,
            profit_factor: 0.0,
            trade_count: 0,
            round_trip_count: 0,
            total_commission: 0.0,
            exposure: 0.0,
        };
        let row = |fast, equity| SweepRow {
            fast_period: fast,
            slow_period: 30,
            final_equity: equity,
            metrics: metrics.clone(),
        };
        let rows = vec![row(5, 100.0), row(10, 120.0), row(15, 120.0)];
        assert_eq!(best_row(&rows).unwrap().fast_period, 10);
        assert!(best_row(&[]).is_none());
    }
}
