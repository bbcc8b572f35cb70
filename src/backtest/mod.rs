//! Deterministic historical replay

pub mod engine;

pub use engine::{BacktestEngine, BacktestResult, EquityPoint, SimulatedTrade, TradeExit};
