//! SmaCross Core: domain types, indicators, strategy, broker and event loop.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, orders, positions, trade log, equity curve)
//! - Streaming simple moving average and crossover detection
//! - Percent-of-equity sizing and the FLAT/LONG strategy state machine
//! - Broker simulator with proportional commission
//! - Single-pass bar loop with same-bar-close or next-bar-open fills
//! - CSV and Yahoo Finance bar sources

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod signals;
pub mod sizers;
pub mod strategy;

pub use config::{ConfigError, EngineConfig, FillTiming, StrategyParams};
pub use engine::{run_backtest, run_backtest_on, BacktestError, RunResult};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync, so runs can move across
    /// rayon worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::TradeLogEntry>();
        require_sync::<domain::TradeLogEntry>();

        // Engine types
        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
        require_send::<RunResult>();
        require_sync::<RunResult>();
        require_send::<engine::Engine>();
        require_sync::<engine::Engine>();
        require_send::<BacktestError>();
        require_sync::<BacktestError>();

        // Data sources
        require_send::<data::CsvBarSource>();
        require_sync::<data::CsvBarSource>();
        require_send::<data::YahooBarSource>();
        require_sync::<data::YahooBarSource>();
    }

    /// Architecture contract: the crossover detector sees indicator values only.
    ///
    /// `observe` takes two optional averages and nothing else, so signals cannot
    /// depend on cash or position state.
    #[test]
    fn crossover_detector_has_no_portfolio_parameter() {
        let mut detector = signals::CrossoverDetector::new();
        assert_eq!(detector.observe(Some(1.0), Some(2.0)), signals::Signal::None);
        assert_eq!(detector.observe(Some(3.0), Some(2.0)), signals::Signal::CrossUp);
    }
}
