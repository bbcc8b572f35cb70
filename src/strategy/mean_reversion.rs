//! Mean-reversion strategy

use rust_decimal::Decimal;

use super::traits::Strategy;
use crate::common::types::{Bar, Signal};

const WINDOW: usize = 20;

/// Bets that price returns to its average: buys when the close drops
/// more than `band_pct` below the 20-bar mean, sells when it rises as
/// far above. Best in range-bound markets.
#[derive(Debug, Clone)]
pub struct MeanReversion {
    band_pct: Decimal,
}

impl MeanReversion {
    pub fn new(band_pct: Decimal) -> Self {
        Self { band_pct }
    }
}

impl Default for MeanReversion {
    fn default() -> Self {
        Self::new(Decimal::ONE)
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn evaluate(&mut self, bars: &[Bar]) -> Signal {
        if bars.len() < WINDOW {
            return Signal::Hold;
        }
        let window = &bars[bars.len() - WINDOW..];
        let mean = window.iter().map(|b| b.close).sum::<Decimal>() / Decimal::from(WINDOW as u64);
        let last = window[WINDOW - 1].close;
        let ratio = self.band_pct / Decimal::from(100);
        if last < mean * (Decimal::ONE - ratio) {
            Signal::Buy
        } else if last > mean * (Decimal::ONE + ratio) {
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
    fn buys_below_the_band() {
        let mut closes = vec![dec!(100); 19];
        closes.push(dec!(90));
        let bars = closes_to_bars(&closes);
        assert_eq!(MeanReversion::default().evaluate(&bars), Signal::Buy);
    }

    #[test]
    fn sells_above_the_band() {
        let mut closes = vec![dec!(100); 19];
        closes.push(dec!(110));
        let bars = closes_to_bars(&closes);
        assert_eq!(MeanReversion::default().evaluate(&bars), Signal::Sell);
    }

    #[test]
    fn holds_near_the_mean() {
        let bars = closes_to_bars(&vec![dec!(100); 20]);
        assert_eq!(MeanReversion::default().evaluate(&bars), Signal::Hold);
    }
}
