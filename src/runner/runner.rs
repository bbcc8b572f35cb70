//! The strategy control loop and its order-lifecycle state machine
//!
//! One iteration per poll cycle: fetch bars, mark to market with the
//! latest streamed tick, honor the kill switch, evaluate exits on an open
//! position, otherwise ask the strategy for an entry. Every iteration is
//! isolated — a transient fetch error or a rejected order is logged and
//! emitted, never allowed to kill the loop.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::{ControlHandle, RunnerPhase, RunnerState};
use crate::common::errors::Result;
use crate::common::events::{EngineEvent, EventBus};
use crate::common::traits::{Exchange, StateStore};
use crate::common::types::{Bar, Order, OrderStatus, OrderType, Position, Side, Signal, Tick};
use crate::config::AppConfig;
use crate::data::DataEngine;
use crate::risk::{atr, ExitDecision, RiskEngine};
use crate::strategy::BoxedStrategy;

/// Why a closing order was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitReason {
    StopLoss,
    TakeProfit,
    StrategySell,
    KillSwitch,
}

/// The polling control loop
pub struct StrategyRunner {
    config: AppConfig,
    data: Arc<DataEngine>,
    exchange: Arc<dyn Exchange>,
    store: Arc<dyn StateStore>,
    risk: RiskEngine,
    strategy: BoxedStrategy,
    events: EventBus,
    control: ControlHandle,
    state: RunnerState,
    tick_rx: Option<mpsc::Receiver<Tick>>,
    next_order_id: u64,
}

impl StrategyRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        data: Arc<DataEngine>,
        exchange: Arc<dyn Exchange>,
        store: Arc<dyn StateStore>,
        strategy: BoxedStrategy,
        events: EventBus,
        tick_rx: Option<mpsc::Receiver<Tick>>,
    ) -> Self {
        let risk = RiskEngine::from_config(&config.risk);
        let state = RunnerState::new(config.mode);
        Self {
            config,
            data,
            exchange,
            store,
            risk,
            strategy,
            events,
            control: ControlHandle::new(),
            state,
            tick_rx,
            next_order_id: 1,
        }
    }

    /// Operator handle for stop / kill switch
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Run until stopped; returns the final session state.
    ///
    /// Any in-flight order submission is awaited to a terminal status
    /// inside the cycle, so stopping never abandons a pending order.
    pub async fn run(mut self) -> RunnerState {
        match self.store.load_state().await {
            Ok(stored) => {
                if let Some(position) = stored.position {
                    info!(symbol = %position.symbol, "restored open position from store");
                    self.state.position = Some(position);
                }
                self.state
                    .record_realized(stored.daily_pnl, Utc::now().date_naive());
            }
            Err(err) => warn!(%err, "could not restore session state"),
        }

        self.state.phase = RunnerPhase::Running;
        info!(
            strategy = self.strategy.name(),
            symbol = %self.config.symbol,
            mode = %self.config.mode,
            "strategy runner started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(self.config.poll_seconds));
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.control.changed() => {}
            }
            if self.control.stop_requested() {
                break;
            }
            if let Err(err) = self.cycle().await {
                // Single-cycle failures never terminate the loop
                error!(%err, "poll cycle failed");
            }
        }

        self.state.phase = if self.control.kill_switch_triggered() {
            RunnerPhase::EmergencyStopped
        } else {
            RunnerPhase::Stopped
        };
        info!(phase = ?self.state.phase, "strategy runner exited");
        self.state
    }

    /// One poll cycle
    async fn cycle(&mut self) -> Result<()> {
        let bars = self
            .data
            .get_ohlcv(
                &self.config.symbol,
                &self.config.timeframe,
                self.config.lookback,
            )
            .await?;
        let Some(last_bar) = bars.last() else {
            debug!("no bars returned, skipping cycle");
            return Ok(());
        };
        let mark_price = self.mark_price(last_bar);

        if self.control.kill_switch_triggered() {
            self.handle_emergency(mark_price).await;
            self.emit_observability(mark_price, None);
            return Ok(());
        }
        if self.state.phase == RunnerPhase::EmergencyStopped {
            // Operator cleared the switch; resume trading
            info!("kill switch cleared, resuming");
            self.state.phase = RunnerPhase::Running;
        }

        let signal = if self.state.position.is_some() {
            self.manage_open_position(&bars, mark_price).await
        } else {
            self.seek_entry(&bars, mark_price).await
        };

        self.emit_observability(mark_price, signal);
        Ok(())
    }

    /// Latest streamed tick if any, else the last bar close
    fn mark_price(&mut self, last_bar: &Bar) -> Decimal {
        if let Some(rx) = self.tick_rx.as_mut() {
            while let Ok(tick) = rx.try_recv() {
                self.data.record_tick(tick);
            }
        }
        self.data
            .latest_tick()
            .filter(|tick| tick.timestamp >= last_bar.timestamp)
            .map(|tick| tick.price)
            .unwrap_or(last_bar.close)
    }

    async fn handle_emergency(&mut self, mark_price: Decimal) {
        if self.state.phase != RunnerPhase::EmergencyStopped {
            warn!("kill switch asserted, flattening");
            self.state.phase = RunnerPhase::EmergencyStopped;
            self.events.emit(EngineEvent::EmergencyStop {
                symbol: self.config.symbol.clone(),
            });
        }
        if self.state.position.is_some() {
            self.close_position(mark_price, ExitReason::KillSwitch).await;
        }
    }

    /// Steps for a cycle with an open position: SL/TP first, then an
    /// explicit strategy exit signal.
    async fn manage_open_position(&mut self, bars: &[Bar], mark_price: Decimal) -> Option<Signal> {
        let position = self.state.position.clone()?;
        match self.risk.should_exit(&position, mark_price) {
            ExitDecision::ExitStop => {
                info!(price = %mark_price, stop = %position.stop_loss_price, "stop loss hit");
                self.close_position(mark_price, ExitReason::StopLoss).await;
                return None;
            }
            ExitDecision::ExitTarget => {
                info!(price = %mark_price, target = %position.take_profit_price, "take profit hit");
                self.close_position(mark_price, ExitReason::TakeProfit).await;
                return None;
            }
            ExitDecision::Hold => {}
        }

        let signal = self.strategy.evaluate(bars);
        if signal == Signal::Sell {
            info!(strategy = self.strategy.name(), "strategy exit signal");
            self.close_position(mark_price, ExitReason::StrategySell).await;
        }
        Some(signal)
    }

    /// Steps for a flat cycle: evaluate the strategy and open on Buy
    async fn seek_entry(&mut self, bars: &[Bar], mark_price: Decimal) -> Option<Signal> {
        let signal = self.strategy.evaluate(bars);
        if signal != Signal::Buy {
            return Some(signal);
        }
        if self.entries_blocked() {
            return Some(signal);
        }

        let bar_atr = atr(bars, self.config.risk.atr_period);
        let equity = self.config.risk.initial_equity + self.state.realized_pnl_today;
        let quantity = self.risk.position_size(equity, bar_atr, mark_price);
        if quantity.is_zero() {
            debug!("sizing returned zero, no entry");
            return Some(signal);
        }

        let order = self.submit_order(Side::Buy, quantity, mark_price).await;
        if order.status == OrderStatus::Filled {
            // bar_atr is defined here: sizing returned a positive quantity
            let (stop, target) = self
                .risk
                .stop_and_target(order.price, bar_atr.unwrap_or_default());
            let position = Position {
                symbol: self.config.symbol.clone(),
                quantity: order.quantity,
                entry_price: order.price,
                stop_loss_price: stop,
                take_profit_price: target,
                opened_at: order.filled_at.unwrap_or(order.requested_at),
            };
            info!(
                qty = %position.quantity,
                entry = %position.entry_price,
                stop = %stop,
                target = %target,
                "position opened"
            );
            self.persist_position(&position).await;
            self.state.position = Some(position.clone());
            self.state.last_trade_at = Some(Utc::now());
            self.events.emit(EngineEvent::PositionUpdated(Some(position)));
        }
        Some(signal)
    }

    async fn close_position(&mut self, price: Decimal, reason: ExitReason) {
        let Some(position) = self.state.position.clone() else {
            return;
        };
        let order = self.submit_order(Side::Sell, position.quantity, price).await;
        if order.status != OrderStatus::Filled {
            // Position unchanged; re-evaluated next cycle
            warn!(?reason, "closing order not filled, position kept");
            return;
        }

        let realized = (order.price - position.entry_price) * position.quantity;
        let today = Utc::now().date_naive();
        let total = self.state.record_realized(realized, today);
        if let Err(err) = self.store.record_daily_pnl(today, total).await {
            warn!(%err, "failed to persist daily pnl");
        }

        let mut closed = position;
        closed.quantity = Decimal::ZERO;
        self.persist_position(&closed).await;

        info!(?reason, pnl = %realized, "position closed");
        self.state.position = None;
        self.state.last_trade_at = Some(Utc::now());
        self.events.emit(EngineEvent::PositionUpdated(None));
    }

    /// Submit a market order and record its terminal status. Failures
    /// come back as retained `Failed` records, never as a crash.
    async fn submit_order(&mut self, side: Side, quantity: Decimal, price: Decimal) -> Order {
        // The kill switch preempts entries even mid-cycle; closing
        // orders are exactly what it demands, so they pass.
        if side == Side::Buy && self.control.kill_switch_triggered() {
            warn!("entry suppressed by kill switch");
            return Order {
                id: self.take_order_id(),
                symbol: self.config.symbol.clone(),
                side,
                quantity,
                order_type: OrderType::Market,
                status: OrderStatus::Cancelled,
                requested_at: Utc::now(),
                filled_at: None,
                price,
            };
        }

        let id = self.take_order_id();
        let requested_at = Utc::now();
        let order = match self
            .exchange
            .create_order(
                &self.config.symbol,
                side,
                OrderType::Market,
                quantity,
                Some(price),
            )
            .await
        {
            Ok(mut filled) => {
                filled.id = id;
                filled
            }
            Err(err) => {
                warn!(%err, %side, %quantity, "order rejected");
                Order {
                    id,
                    symbol: self.config.symbol.clone(),
                    side,
                    quantity,
                    order_type: OrderType::Market,
                    status: OrderStatus::Failed,
                    requested_at,
                    filled_at: None,
                    price,
                }
            }
        };

        if let Err(err) = self.store.save_order(&order).await {
            warn!(%err, "failed to persist order");
        }
        self.events.emit(EngineEvent::OrderPlaced(order.clone()));
        order
    }

    /// Max-daily-loss guard and post-trade cooldown
    fn entries_blocked(&self) -> bool {
        let max_loss = self.config.risk.max_daily_loss;
        if max_loss > Decimal::ZERO && self.state.realized_pnl_today <= -max_loss {
            warn!(pnl = %self.state.realized_pnl_today, "max daily loss hit, entries paused");
            return true;
        }
        if self.config.risk.cooldown_seconds > 0 {
            if let Some(last) = self.state.last_trade_at {
                let elapsed = Utc::now().signed_duration_since(last);
                if elapsed.num_seconds() < self.config.risk.cooldown_seconds as i64 {
                    debug!("in post-trade cooldown");
                    return true;
                }
            }
        }
        false
    }

    fn emit_observability(&self, price: Decimal, signal: Option<Signal>) {
        self.events.emit(EngineEvent::PriceUpdated {
            symbol: self.config.symbol.clone(),
            price,
            timestamp: Utc::now(),
        });
        self.events.emit(EngineEvent::StrategySignal {
            strategy: self.strategy.name().to_string(),
            signal: signal.unwrap_or(Signal::Hold),
            price,
        });
    }

    async fn persist_position(&self, position: &Position) {
        if let Err(err) = self.store.save_position(position).await {
            warn!(%err, "failed to persist position");
        }
    }

    fn take_order_id(&mut self) -> u64 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }
}
