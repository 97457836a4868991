//! Bar-by-bar event loop.
//!
//! Per bar, in order:
//! 1. Start-of-bar: fill the order queued on the previous bar (next-bar-open only)
//! 2. Indicators: feed the close into both averages and the crossover detector
//! 3. Decision: strategy step against pre-trade equity at the close
//! 4. Execution: fill at the close, or queue for the next open. BUYs are
//!    capped at what cash covers including commission.
//! 5. Post-bar: record post-trade equity at the close

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, FillTiming};
use crate::domain::{Bar, BarSeries, EquityPoint, Order, OrderSide, TradeLogEntry};
use crate::indicators::Sma;
use crate::signals::CrossoverDetector;
use crate::strategy::{Hold, SmaCross, StrategyState};

use super::broker::{Broker, BrokerError};
use super::state::RunResult;
use super::BacktestError;

/// An order decided on one bar and waiting for the next bar's open.
#[derive(Debug, Clone, Copy)]
struct PendingOrder {
    order: Order,
    /// Strategy state before the decision, restored if the order is dropped.
    prior_state: StrategyState,
    /// Dollar allocation the sizer targeted when the order was decided.
    allocation: f64,
    decided_at: NaiveDateTime,
}

/// Single-symbol backtest engine.
///
/// Owns the indicator state, the strategy state and the broker. Feed bars in
/// timestamp order with [`Engine::process_bar`], then call [`Engine::finish`].
#[derive(Debug, Clone)]
pub struct Engine {
    fill_timing: FillTiming,
    strategy: SmaCross,
    fast: Sma,
    slow: Sma,
    detector: CrossoverDetector,
    broker: Broker,
    state: StrategyState,
    pending: Option<PendingOrder>,
    trade_log: Vec<TradeLogEntry>,
    equity_curve: Vec<EquityPoint>,
    bar_count: usize,
    zero_size_skips: usize,
    dropped_orders: usize,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        let params = config.strategy;
        if params.slow_period <= params.fast_period {
            warn!(
                fast = params.fast_period,
                slow = params.slow_period,
                "slow period does not exceed fast period; crossovers will be inverted or absent"
            );
        }

        Ok(Self {
            fill_timing: config.fill_timing,
            strategy: SmaCross::new(params)?,
            fast: Sma::new(params.fast_period)?,
            slow: Sma::new(params.slow_period)?,
            detector: CrossoverDetector::new(),
            broker: Broker::new(config.starting_cash, config.commission_rate),
            state: StrategyState::Flat,
            pending: None,
            trade_log: Vec::new(),
            equity_curve: Vec::new(),
            bar_count: 0,
            zero_size_skips: 0,
            dropped_orders: 0,
        })
    }

    /// Process one bar. Bars must arrive in strictly increasing timestamp order;
    /// [`BarSeries`] guarantees that for [`run_backtest`].
    pub fn process_bar(&mut self, bar: &Bar) -> Result<(), BrokerError> {
        // ─── Phase 1: Start-of-bar ───
        if let Some(pending) = self.pending.take() {
            self.fill_pending(pending, bar)?;
        }

        // ─── Phase 2: Indicators ───
        let slow_was_ready = self.slow.is_ready();
        let fast = self.fast.observe(bar.close);
        let slow = self.slow.observe(bar.close);
        if !slow_was_ready && slow.is_some() {
            debug!(bar = self.bar_count, timestamp = %bar.timestamp, "warm-up complete");
        }
        let signal = self.detector.observe(fast, slow);

        // ─── Phase 3: Decision ───
        let equity = self.broker.value(bar.close);
        let decision = self.strategy.decide(self.state, signal, equity, bar.close);

        if decision.hold == Some(Hold::ZeroSize) {
            self.zero_size_skips += 1;
            debug!(
                timestamp = %bar.timestamp,
                equity,
                price = bar.close,
                "cross up sized to zero shares; staying flat"
            );
        }

        // ─── Phase 4: Execution ───
        if let Some(order) = decision.order {
            let allocation = self.strategy.sizer().allocation(equity);
            match self.fill_timing {
                FillTiming::SameBarClose => match self.clamp_to_cash(order, bar.close) {
                    Some(order) => self.fill(order, bar.timestamp, allocation)?,
                    None => {
                        self.zero_size_skips += 1;
                        debug!(
                            timestamp = %bar.timestamp,
                            cash = self.broker.cash(),
                            price = bar.close,
                            "cross up unaffordable after commission; staying flat"
                        );
                    }
                },
                FillTiming::NextBarOpen => {
                    self.pending = Some(PendingOrder {
                        order,
                        prior_state: self.state,
                        allocation,
                        decided_at: bar.timestamp,
                    });
                    self.state = decision.next_state;
                }
            }
        } else {
            self.state = decision.next_state;
        }

        // ─── Phase 5: Post-bar ───
        self.equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity: self.broker.value(bar.close),
        });
        self.bar_count += 1;

        Ok(())
    }

    fn fill_pending(&mut self, pending: PendingOrder, bar: &Bar) -> Result<(), BrokerError> {
        match self.clamp_to_cash(pending.order, bar.open) {
            Some(order) => self.fill(order, bar.timestamp, pending.allocation),
            None => {
                self.dropped_orders += 1;
                self.state = pending.prior_state;
                debug!(
                    decided_at = %pending.decided_at,
                    open = bar.open,
                    "queued buy unaffordable at open; dropped"
                );
                Ok(())
            }
        }
    }

    /// Reprice `order` at `price`, capping a BUY at the shares cash covers
    /// with commission. `None` when not even one share fits.
    ///
    /// The sizer works from equity alone, so a large fraction plus commission
    /// can ask for more than the broker accepts.
    fn clamp_to_cash(&self, order: Order, price: f64) -> Option<Order> {
        match order.side {
            OrderSide::Sell => Some(order.at_price(price)),
            OrderSide::Buy => {
                let size = order.size.min(self.broker.affordable_shares(price));
                if size < order.size {
                    debug!(requested = order.size, size, price, "buy clamped to cash");
                }
                (size > 0).then(|| Order::buy(size, price))
            }
        }
    }

    /// Execute, record, and move the strategy state to match the fill.
    fn fill(
        &mut self,
        order: Order,
        timestamp: NaiveDateTime,
        allocation: f64,
    ) -> Result<(), BrokerError> {
        let entry = self.broker.execute(&order, timestamp)?;
        self.state = match order.side {
            OrderSide::Buy => StrategyState::Long { size: order.size },
            OrderSide::Sell => StrategyState::Flat,
        };
        self.log_fill(&entry, allocation);
        self.trade_log.push(entry);
        Ok(())
    }

    fn log_fill(&self, entry: &TradeLogEntry, allocation: f64) {
        match entry.side {
            OrderSide::Buy => info!(
                timestamp = %entry.timestamp,
                size = entry.size,
                price = entry.price,
                commission = entry.commission,
                "BUY {} @ {:.2} (alloc {:.0}% = {:.2})",
                entry.size,
                entry.price,
                self.strategy.sizer().fraction() * 100.0,
                allocation
            ),
            OrderSide::Sell => info!(
                timestamp = %entry.timestamp,
                size = entry.size,
                price = entry.price,
                commission = entry.commission,
                "SELL {} @ {:.2}",
                entry.size,
                entry.price
            ),
        }
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn trade_log(&self) -> &[TradeLogEntry] {
        &self.trade_log
    }

    /// Close out the run. A still-queued order is dropped.
    pub fn finish(mut self) -> RunResult {
        if let Some(pending) = self.pending.take() {
            self.dropped_orders += 1;
            self.state = pending.prior_state;
            info!(
                side = %pending.order.side,
                decided_at = %pending.decided_at,
                "order queued on the last bar never filled; dropped"
            );
        }

        let final_equity = self
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or_else(|| self.broker.cash());

        RunResult {
            starting_value: self.broker.starting_cash(),
            final_equity,
            trade_log: self.trade_log,
            equity_curve: self.equity_curve,
            bar_count: self.bar_count,
            insufficient_data: !self.slow.is_ready(),
            zero_size_skips: self.zero_size_skips,
            dropped_orders: self.dropped_orders,
            final_position: self.broker.position(),
            total_commission: self.broker.total_commission(),
            fill_timing: self.fill_timing,
        }
    }
}

/// Run a backtest over a validated bar series.
///
/// Single pass, deterministic: identical inputs produce identical results.
pub fn run_backtest(bars: &BarSeries, config: &EngineConfig) -> Result<RunResult, BacktestError> {
    let mut engine = Engine::new(config)?;
    for bar in bars {
        engine.process_bar(bar)?;
    }
    let result = engine.finish();

    if result.insufficient_data {
        info!(
            bars = result.bar_count,
            slow = config.strategy.slow_period,
            "insufficient data: slow average never defined"
        );
    }
    Ok(result)
}

/// Validate raw bars into a series, then run.
pub fn run_backtest_on(bars: Vec<Bar>, config: &EngineConfig) -> Result<RunResult, BacktestError> {
    let series = BarSeries::new(bars)?;
    run_backtest(&series, config)
}
