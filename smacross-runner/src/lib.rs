//! SmaCross Runner: run orchestration, metrics, artifacts and sweeps.
//!
//! This crate builds on `smacross-core` to provide:
//! - TOML run configuration with defaults for every field
//! - Data resolution (cached CSV or Yahoo download)
//! - Single-backtest runner with round-trip extraction and metrics
//! - Artifact export (manifest, trade log, round trips, equity curve)
//! - Parallel (fast, slow) parameter sweeps

pub mod config;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BrokerSection, ConfigError, DataSection, RunConfig, StrategySection};
pub use export::save_artifacts;
pub use metrics::{extract_round_trips, PerformanceMetrics, RoundTrip};
pub use runner::{
    load_bars, run_backtest_from_bars, run_single_backtest, BacktestResult, LoadedBars, RunError,
    SCHEMA_VERSION,
};
pub use sweep::{best_row, run_sweep, ParamGrid, SweepRow};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
    }

    #[test]
    fn run_error_is_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
