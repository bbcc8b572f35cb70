//! ebbtide
//!
//! A volatility-aware trading engine for a single instrument and
//! timeframe: a cached, rate-limited data engine, a streaming price feed
//! with reconnect/backoff, ATR-based risk controls with a kill switch,
//! and a deterministic backtest engine that replays the exact live
//! decision path.

pub mod backtest;
pub mod common;
pub mod config;
pub mod data;
pub mod exchange;
pub mod risk;
pub mod runner;
pub mod strategy;

// Re-export commonly used types
pub use common::errors::{EngineError, Result};
pub use common::events::{EngineEvent, EventBus};
pub use common::traits::{Exchange, MemoryStore, StateStore, StoredState};
pub use common::types::{Bar, Mode, Order, OrderStatus, OrderType, Position, Side, Signal, Tick};
pub use config::{load_config, AppConfig, FillPoint};

pub use backtest::{BacktestEngine, BacktestResult, SimulatedTrade, TradeExit};
pub use data::{Backoff, CoinbaseTransport, DataEngine, FeedHealth, FeedState, PriceFeed, RateLimiter};
pub use risk::{atr, ExitDecision, RiskEngine};
pub use runner::{ControlHandle, RunnerPhase, RunnerState, StrategyRunner};
pub use strategy::{
    strategy_from_name, BoxedStrategy, Breakout, ContraMomentum, MeanReversion, Momentum,
    Scalping, Strategy,
};
pub use exchange::{PaperExchange, PublicMarketData};
