//! Pure risk decision logic shared by the live and backtest paths
//!
//! Every function here is a pure function of its inputs and the
//! configured parameters. The runner and the backtest engine call the
//! same code, which is what makes their behavior provably equivalent on
//! equal inputs. The kill switch itself is an operator flag on the
//! runner's control handle; its evaluation point (before every order
//! submission) is identical in both paths.

use rust_decimal::Decimal;

use crate::common::types::Position;
use crate::config::RiskConfig;

/// Exit decision for an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Hold,
    ExitStop,
    ExitTarget,
}

/// ATR-based sizing and SL/TP evaluation
#[derive(Debug, Clone)]
pub struct RiskEngine {
    risk_pct: Decimal,
    atr_multiplier: Decimal,
    take_profit_atr_multiplier: Decimal,
    qty_increment: Decimal,
}

impl RiskEngine {
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            risk_pct: config.risk_pct,
            atr_multiplier: config.atr_multiplier,
            take_profit_atr_multiplier: config.take_profit_atr_multiplier,
            qty_increment: config.qty_increment,
        }
    }

    /// Quantity such that a stop hit at `entry - atr_multiplier * atr`
    /// loses about `risk_pct` percent of equity.
    ///
    /// Returns zero when ATR is zero or undefined, or when the size
    /// rounded down to the venue's quantity increment is unaffordable.
    pub fn position_size(
        &self,
        account_equity: Decimal,
        atr: Option<Decimal>,
        entry_price: Decimal,
    ) -> Decimal {
        let atr = match atr {
            Some(v) if v > Decimal::ZERO => v,
            _ => return Decimal::ZERO,
        };
        if entry_price <= Decimal::ZERO || account_equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let stop_distance = self.atr_multiplier * atr;
        let risk_amount = account_equity * self.risk_pct / Decimal::from(100);
        let raw = risk_amount / stop_distance;

        // Never size beyond what the equity can buy
        let affordable = account_equity / entry_price;
        let capped = raw.min(affordable);

        let qty = self.round_to_increment(capped);
        if qty < self.qty_increment {
            Decimal::ZERO
        } else {
            qty
        }
    }

    /// Stop and target prices for a long entry
    pub fn stop_and_target(&self, entry_price: Decimal, atr: Decimal) -> (Decimal, Decimal) {
        let stop = entry_price - self.atr_multiplier * atr;
        let target = entry_price + self.take_profit_atr_multiplier * atr;
        (stop, target)
    }

    /// Evaluate SL/TP for an open long. Stop-loss takes priority when
    /// both thresholds would trigger in the same evaluation.
    pub fn should_exit(&self, position: &Position, current_price: Decimal) -> ExitDecision {
        if current_price <= position.stop_loss_price {
            ExitDecision::ExitStop
        } else if current_price >= position.take_profit_price {
            ExitDecision::ExitTarget
        } else {
            ExitDecision::Hold
        }
    }

    fn round_to_increment(&self, qty: Decimal) -> Decimal {
        (qty / self.qty_increment).floor() * self.qty_increment
    }
}
