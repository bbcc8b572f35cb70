//! Volatility-aware risk decisions: ATR, sizing, SL/TP evaluation

pub mod atr;
pub mod engine;

pub use atr::atr;
pub use engine::{ExitDecision, RiskEngine};
