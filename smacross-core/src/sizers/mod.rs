//! Position sizers: determine trade quantity.
//!
//! Sizers translate an equity budget into a whole share count.
//! They are portfolio-aware (use equity) but signal-agnostic: they never decide
//! whether to trade, only how much.

pub mod percent_equity;

pub use percent_equity::{shares_for_fraction, PercentOfEquity};
