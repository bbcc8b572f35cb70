//! Pluggable trading strategies
//!
//! A strategy is anything implementing [`Strategy`]: it sees the ordered
//! bar history and answers buy/sell/hold. Concrete variants are selected
//! by name from configuration. Strategies must be deterministic over
//! their inputs so the backtest path replays live behavior exactly.

mod breakout;
mod contra_momentum;
mod mean_reversion;
mod momentum;
mod scalping;
mod traits;

pub use breakout::Breakout;
pub use contra_momentum::ContraMomentum;
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;
pub use scalping::Scalping;
pub use traits::{BoxedStrategy, Strategy};

use crate::common::errors::{EngineError, Result};

/// Build the configured strategy variant by name
pub fn strategy_from_name(name: &str) -> Result<BoxedStrategy> {
    match name {
        "momentum" => Ok(Box::new(Momentum::default())),
        "mean_reversion" => Ok(Box::new(MeanReversion::default())),
        "breakout" => Ok(Box::new(Breakout::default())),
        "scalping" => Ok(Box::new(Scalping::default())),
        "contra_momentum" => Ok(Box::new(ContraMomentum::default())),
        other => Err(EngineError::Configuration(format!(
            "unknown strategy '{other}' (expected momentum, mean_reversion, breakout, \
             scalping or contra_momentum)"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::common::types::Bar;

    /// Flat bars (open = high = low = close) from a close series
    pub fn closes_to_bars(closes: &[Decimal]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: Utc.timestamp_opt(i as i64 * 60, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: Decimal::ONE,
            })
            .collect()
    }
}
