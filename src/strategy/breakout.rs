//! Range-breakout strategy

use rust_decimal::Decimal;

use super::traits::Strategy;
use crate::common::types::{Bar, Signal};

const WINDOW: usize = 20;

/// Catches expanding volatility: buys when the close clears the prior
/// 20-bar high, sells when it breaks the prior 20-bar low. A small
/// margin filters out marginal pokes through the range.
#[derive(Debug, Clone)]
pub struct Breakout {
    margin_pct: Decimal,
}

impl Breakout {
    pub fn new(margin_pct: Decimal) -> Self {
        Self { margin_pct }
    }
}

impl Default for Breakout {
    fn default() -> Self {
        Self::new(Decimal::new(1, 1)) // 0.1%
    }
}

impl Strategy for Breakout {
    fn name(&self) -> &str {
        "breakout"
    }

    fn evaluate(&mut self, bars: &[Bar]) -> Signal {
        if bars.len() < WINDOW {
            return Signal::Hold;
        }
        let window = &bars[bars.len() - WINDOW..];
        let prior = &window[..WINDOW - 1];
        let prior_high = prior.iter().map(|b| b.high).max().unwrap_or_default();
        let prior_low = prior
            .iter()
            .map(|b| b.low)
            .min()
            .unwrap_or(Decimal::MAX);
        let last_close = window[WINDOW - 1].close;
        let ratio = self.margin_pct / Decimal::from(100);
        if last_close > prior_high * (Decimal::ONE + ratio) {
            Signal::Buy
        } else if last_close < prior_low * (Decimal::ONE - ratio) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testutil::closes_to_bars;
    use rust_decimal_macros::dec;

    #[test]
    fn buys_on_upside_breakout() {
        let mut closes = vec![dec!(100); 19];
        closes.push(dec!(102));
        let bars = closes_to_bars(&closes);
        assert_eq!(Breakout::default().evaluate(&bars), Signal::Buy);
    }

    #[test]
    fn sells_on_downside_break() {
        let mut closes = vec![dec!(100); 19];
        closes.push(dec!(98));
        let bars = closes_to_bars(&closes);
        assert_eq!(Breakout::default().evaluate(&bars), Signal::Sell);
    }

    #[test]
    fn holds_inside_the_range() {
        let bars = closes_to_bars(&vec![dec!(100); 20]);
        assert_eq!(Breakout::default().evaluate(&bars), Signal::Hold);
    }
}
