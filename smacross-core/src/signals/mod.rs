//! Signals: discrete events derived from indicator values.
//!
//! Signals are portfolio-agnostic: they see indicator outputs only, never cash
//! or position state.

pub mod crossover;

pub use crossover::{CrossoverDetector, Signal};
