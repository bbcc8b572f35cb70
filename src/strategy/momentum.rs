//! Trend-following momentum strategy

use rust_decimal::Decimal;

use super::traits::Strategy;
use crate::common::types::{Bar, Signal};

const WINDOW: usize = 5;

/// Buys when the close rises more than `threshold_pct` over the last
/// five bars, sells when it falls as much. Best in trending markets.
#[derive(Debug, Clone)]
pub struct Momentum {
    threshold_pct: Decimal,
}

impl Momentum {
    pub fn new(threshold_pct: Decimal) -> Self {
        Self { threshold_pct }
    }
}

impl Default for Momentum {
    fn default() -> Self {
        // 0.2% move over the window
        Self::new(Decimal::new(2, 1))
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn evaluate(&mut self, bars: &[Bar]) -> Signal {
        if bars.len() < WINDOW {
            return Signal::Hold;
        }
        let window = &bars[bars.len() - WINDOW..];
        let first = window[0].close;
        let last = window[WINDOW - 1].close;
        if first.is_zero() {
            return Signal::Hold;
        }
        let ratio = self.threshold_pct / Decimal::from(100);
        if last > first * (Decimal::ONE + ratio) {
            Signal::Buy
        } else if last < first * (Decimal::ONE - ratio) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
