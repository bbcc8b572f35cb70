//! Average true range over an ordered bar sequence

use rust_decimal::Decimal;

use crate::common::types::Bar;

/// Simple-moving-average ATR over the last `period` true ranges.
///
/// True range per bar is `max(high - low, |high - prev_close|,
/// |low - prev_close|)`. Returns `None` until `period + 1` bars exist;
/// an undefined ATR must never be used for sizing.
pub fn atr(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let start = bars.len() - period;
    let mut sum = Decimal::ZERO;
    for i in start..bars.len() {
        sum += bars[i].true_range(bars[i - 1].close);
    }
    Some(sum / Decimal::from(period as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(i: i64, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar {
            timestamp: Utc.timestamp_opt(i * 60, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: dec!(1),
        }
    }

    #[test]
    fn undefined_below_period_plus_one_bars() {
        let bars: Vec<Bar> = (0..14)
            .map(|i| bar(i, dec!(101), dec!(99), dec!(100)))
            .collect();
        assert!(atr(&bars, 14).is_none());
        let bars: Vec<Bar> = (0..15)
            .map(|i| bar(i, dec!(101), dec!(99), dec!(100)))
            .collect();
        assert!(atr(&bars, 14).is_some());
    }

    #[test]
    fn constant_range_bars_average_to_that_range() {
        let bars: Vec<Bar> = (0..20)
            .map(|i| bar(i, dec!(105), dec!(100), dec!(102)))
            .collect();
        // Every bar: high-low = 5, gaps within range
        assert_eq!(atr(&bars, 14).unwrap(), dec!(5));
    }

    #[test]
    fn gap_extends_true_range() {
        let mut bars: Vec<Bar> = (0..3).map(|i| bar(i, dec!(101), dec!(99), dec!(100))).collect();
        // Gap down: previous close 100, bar trades 90-91
        bars.push(bar(3, dec!(91), dec!(90), dec!(90)));
        // TRs over period 3: 2, 2, max(1, |91-100|, |90-100|) = 10
        assert_eq!(atr(&bars, 3).unwrap(), dec!(14) / dec!(3));
    }
}
