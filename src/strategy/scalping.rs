//! Range-scalping strategy

use rust_decimal::Decimal;

use super::traits::Strategy;
use crate::common::types::{Bar, Signal};

const WINDOW: usize = 10;

/// Trades the extremes of a tight range: buys when the close sits in the
/// bottom `edge_pct` share of the 10-bar close range, sells in the top
/// share. Best in low-volatility sideways markets.
#[derive(Debug, Clone)]
pub struct Scalping {
    edge_pct: Decimal,
}

impl Scalping {
    pub fn new(edge_pct: Decimal) -> Self {
        Self { edge_pct }
    }
}

impl Default for Scalping {
    fn default() -> Self {
        // Bottom/top 10% of the range
        Self::new(Decimal::TEN)
    }
}

impl Strategy for Scalping {
    fn name(&self) -> &str {
        "scalping"
    }

    fn evaluate(&mut self, bars: &[Bar]) -> Signal {
        if bars.len() < WINDOW {
            return Signal::Hold;
        }
        let window = &bars[bars.len() - WINDOW..];
        let mut lowest = window[0].close;
        let mut highest = window[0].close;
        for bar in window {
            lowest = lowest.min(bar.close);
            highest = highest.max(bar.close);
        }
        let spread = highest - lowest;
        if spread.is_zero() {
            // A dead-flat range has no tradeable edges
            return Signal::Hold;
        }
        let edge = spread * self.edge_pct / Decimal::from(100);
        let last = window[WINDOW - 1].close;
        if last <= lowest + edge {
            Signal::Buy
        } else if last >= highest - edge {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
