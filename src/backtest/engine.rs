//! Deterministic replay of the live decision path over historical bars
//!
//! The backtest drives the exact Strategy and RiskEngine code the runner
//! uses. It is single-threaded and synchronous by design: no wall clock,
//! no randomness, so identical inputs and configuration always produce
//! identical results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::errors::{EngineError, Result};
use crate::common::types::{Bar, Position};
use crate::config::{AppConfig, FillPoint};
use crate::risk::{atr, ExitDecision, RiskEngine};
use crate::runner::ControlHandle;
use crate::strategy::Strategy;

/// Why a simulated trade closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeExit {
    StopLoss,
    TakeProfit,
    Signal,
    KillSwitch,
}

/// One closed simulated trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub entry_at: DateTime<Utc>,
    pub exit_at: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    /// Net of entry and exit fees
    pub pnl: Decimal,
    pub exit: TradeExit,
}

/// Equity sampled at one bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// Full backtest output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<SimulatedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Holding from the first evaluated bar, for comparison
    pub buy_hold_curve: Vec<Decimal>,
    pub initial_equity: Decimal,
    pub final_equity: Decimal,
    pub total_return_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub win_rate_pct: Decimal,
    pub trade_count: usize,
}

struct OpenLot {
    position: Position,
    entry_fee: Decimal,
}

/// Replay driver sharing the live risk logic
pub struct BacktestEngine {
    risk: RiskEngine,
    atr_period: usize,
    initial_equity: Decimal,
    slippage_pct: Decimal,
    fee_pct: Decimal,
    fill_point: FillPoint,
    symbol: String,
}

impl BacktestEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            risk: RiskEngine::from_config(&config.risk),
            atr_period: config.risk.atr_period,
            initial_equity: config.risk.initial_equity,
            slippage_pct: config.backtest.slippage_pct,
            fee_pct: config.backtest.fee_pct,
            fill_point: config.backtest.fill_point,
            symbol: config.symbol.clone(),
        }
    }

    /// Replay `bars` through the strategy. The control handle carries the
    /// kill switch so its evaluation point matches the live path.
    pub fn run(
        &self,
        bars: &[Bar],
        strategy: &mut dyn Strategy,
        control: &ControlHandle,
    ) -> Result<BacktestResult> {
        let warmup = self.atr_period + 1;
        if bars.len() <= warmup {
            return Err(EngineError::Configuration(format!(
                "backtest needs more than {warmup} bars, got {}",
                bars.len()
            )));
        }

        let mut cash = self.initial_equity;
        let mut lot: Option<OpenLot> = None;
        let mut trades: Vec<SimulatedTrade> = Vec::new();
        let mut equity_curve: Vec<EquityPoint> = Vec::new();
        let mut buy_hold_curve: Vec<Decimal> = Vec::new();
        let mut peak = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;
        let bh_start_price = bars[warmup].close;

        for idx in warmup..bars.len() {
            let window = &bars[..=idx];
            let bar = &bars[idx];
            let fill_price = match self.fill_point {
                FillPoint::Open => bar.open,
                FillPoint::Close => bar.close,
            };

            if control.kill_switch_triggered() {
                if let Some(open) = lot.take() {
                    let exit_price = self.sell_fill(fill_price);
                    cash += self.settle(&mut trades, open, exit_price, bar, TradeExit::KillSwitch);
                }
                // Entries stay suspended while the switch is asserted
            } else if let Some(open) = lot.take() {
                lot = self.manage_lot(open, window, bar, fill_price, strategy, &mut trades, &mut cash);
            } else {
                let signal = strategy.evaluate(window);
                if signal == crate::common::types::Signal::Buy {
                    lot = self.try_enter(window, bar, fill_price, &mut cash);
                }
            }

            let marked = cash
                + lot
                    .as_ref()
                    .map(|open| open.position.quantity * bar.close)
                    .unwrap_or_default();
            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: marked,
            });
            buy_hold_curve.push(self.initial_equity * bar.close / bh_start_price);

            if marked > peak {
                peak = marked;
            }
            if peak > Decimal::ZERO {
                let drawdown = (peak - marked) / peak * Decimal::from(100);
                if drawdown > max_drawdown_pct {
                    max_drawdown_pct = drawdown;
                }
            }
        }

        // An open lot at the end stays marked to market, not force-closed
        let final_equity = cash
            + lot
                .as_ref()
                .map(|open| open.position.quantity * bars[bars.len() - 1].close)
                .unwrap_or_default();

        let wins = trades.iter().filter(|t| t.pnl > Decimal::ZERO).count();
        let trade_count = trades.len();
        let win_rate_pct = if trade_count > 0 {
            Decimal::from(wins as u64) / Decimal::from(trade_count as u64) * Decimal::from(100)
        } else {
            Decimal::ZERO
        };
        let total_return_pct =
            (final_equity - self.initial_equity) / self.initial_equity * Decimal::from(100);

        Ok(BacktestResult {
            trades,
            equity_curve,
            buy_hold_curve,
            initial_equity: self.initial_equity,
            final_equity,
            total_return_pct,
            max_drawdown_pct,
            win_rate_pct,
            trade_count,
        })
    }

    /// Intrabar SL/TP (stop checked first), then the strategy's own exit
    #[allow(clippy::too_many_arguments)]
    fn manage_lot(
        &self,
        open: OpenLot,
        window: &[Bar],
        bar: &Bar,
        fill_price: Decimal,
        strategy: &mut dyn Strategy,
        trades: &mut Vec<SimulatedTrade>,
        cash: &mut Decimal,
    ) -> Option<OpenLot> {
        let stop = open.position.stop_loss_price;
        let target = open.position.take_profit_price;

        // Intrabar tie-break: the stop wins when both levels are inside
        // the bar's range.
        if bar.low <= stop {
            let exit_price = self.sell_fill(stop);
            *cash += self.settle(trades, open, exit_price, bar, TradeExit::StopLoss);
            return None;
        }
        if bar.high >= target {
            let exit_price = self.sell_fill(target);
            *cash += self.settle(trades, open, exit_price, bar, TradeExit::TakeProfit);
            return None;
        }
        debug_assert_eq!(
            self.risk.should_exit(&open.position, fill_price),
            ExitDecision::Hold
        );

        if strategy.evaluate(window) == crate::common::types::Signal::Sell {
            let exit_price = self.sell_fill(fill_price);
            *cash += self.settle(trades, open, exit_price, bar, TradeExit::Signal);
            return None;
        }
        Some(open)
    }

    fn try_enter(
        &self,
        window: &[Bar],
        bar: &Bar,
        fill_price: Decimal,
        cash: &mut Decimal,
    ) -> Option<OpenLot> {
        let bar_atr = atr(window, self.atr_period)?;
        let quantity = self.risk.position_size(*cash, Some(bar_atr), fill_price);
        if quantity.is_zero() {
            return None;
        }
        let buy_price = self.buy_fill(fill_price);
        let cost = quantity * buy_price;
        let fee = cost * self.fee_pct / Decimal::from(100);
        if cost + fee > *cash {
            debug!("entry unaffordable after slippage and fees, skipped");
            return None;
        }
        *cash -= cost + fee;
        let (stop_loss_price, take_profit_price) = self.risk.stop_and_target(buy_price, bar_atr);
        Some(OpenLot {
            position: Position {
                symbol: self.symbol.clone(),
                quantity,
                entry_price: buy_price,
                stop_loss_price,
                take_profit_price,
                opened_at: bar.timestamp,
            },
            entry_fee: fee,
        })
    }

    /// Close the lot, record the trade, return the net proceeds
    fn settle(
        &self,
        trades: &mut Vec<SimulatedTrade>,
        open: OpenLot,
        exit_price: Decimal,
        bar: &Bar,
        exit: TradeExit,
    ) -> Decimal {
        let proceeds = open.position.quantity * exit_price;
        let exit_fee = proceeds * self.fee_pct / Decimal::from(100);
        let pnl = (exit_price - open.position.entry_price) * open.position.quantity
            - open.entry_fee
            - exit_fee;
        trades.push(SimulatedTrade {
            entry_at: open.position.opened_at,
            exit_at: bar.timestamp,
            entry_price: open.position.entry_price,
            exit_price,
            quantity: open.position.quantity,
            pnl,
            exit,
        });
        proceeds - exit_fee
    }

    /// Slippage works against the trader: buys fill higher
    fn buy_fill(&self, price: Decimal) -> Decimal {
        price * (Decimal::ONE + self.slippage_pct / Decimal::from(100))
    }

    /// ... and sells fill lower
    fn sell_fill(&self, price: Decimal) -> Decimal {
        price * (Decimal::ONE - self.slippage_pct / Decimal::from(100))
    }
}
