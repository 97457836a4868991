//! Domain types for the SMA crossover backtester

pub mod bar;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::{Bar, BarError, BarSeries};
pub use order::{Order, OrderSide};
pub use position::Position;
pub use trade::{EquityPoint, TradeLogEntry};
