//! Contra-momentum strategy

use rust_decimal::Decimal;

use super::traits::Strategy;
use crate::common::types::{Bar, Signal};

/// Fades sharp single-bar moves: sells after the close spikes more than
/// `threshold_pct` over the previous close, buys after an equal dip.
/// Bets on one-bar mean reversion; dangerous in strong trends.
#[derive(Debug, Clone)]
pub struct ContraMomentum {
    threshold_pct: Decimal,
}

impl ContraMomentum {
    pub fn new(threshold_pct: Decimal) -> Self {
        Self { threshold_pct }
    }
}

impl Default for ContraMomentum {
    fn default() -> Self {
        // 0.3% move over one bar
        Self::new(Decimal::new(3, 1))
    }
}

impl Strategy for ContraMomentum {
    fn name(&self) -> &str {
        "contra_momentum"
    }

    fn evaluate(&mut self, bars: &[Bar]) -> Signal {
        if bars.len() < 2 {
            return Signal::Hold;
        }
        let last = bars[bars.len() - 1].close;
        let prev = bars[bars.len() - 2].close;
        if prev.is_zero() {
            return Signal::Hold;
        }
        let ratio = self.threshold_pct / Decimal::from(100);
        if last > prev * (Decimal::ONE + ratio) {
            Signal::Sell
        } else if last < prev * (Decimal::ONE - ratio) {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }
}
