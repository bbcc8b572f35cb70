//! Strategy capability interface

use crate::common::types::{Bar, Signal};

/// Core strategy trait
///
/// Strategies receive the ordered bar history for the instrument and emit
/// a buy/sell/hold signal. A strategy may carry internal indicator state
/// across calls, but must be pure with respect to that state: the same
/// sequence of inputs always produces the same sequence of signals. No
/// I/O, no clocks, no randomness — the backtest path depends on it.
/// `Send + Sync` so a boxed strategy can live inside the spawned runner
/// task while its future is held across awaits.
pub trait Strategy: Send + Sync {
    /// Unique identifier for this strategy
    fn name(&self) -> &str;

    /// Evaluate the bar history, oldest bar first.
    ///
    /// Histories shorter than the strategy's warmup window return
    /// `Signal::Hold`.
    fn evaluate(&mut self, bars: &[Bar]) -> Signal;
}

/// Boxed strategy for dynamic dispatch
pub type BoxedStrategy = Box<dyn Strategy>;
