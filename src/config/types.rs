//! Configuration types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::{EngineError, Result};
use crate::common::types::Mode;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session mode (paper, backtest, live)
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Instrument symbol, e.g. "BTC/USD"
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Bar timeframe, e.g. "5m"
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    /// Number of bars fetched per poll (strategy + ATR warmup window)
    #[serde(default = "default_lookback")]
    pub lookback: u32,
    /// Strategy variant: "momentum", "mean_reversion", "breakout",
    /// "scalping" or "contra_momentum"
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Poll cycle length in seconds; also the OHLCV cache ttl
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
    /// Risk configuration
    #[serde(default)]
    pub risk: RiskConfig,
    /// Market-data configuration
    #[serde(default)]
    pub data: DataConfig,
    /// Backtest configuration
    #[serde(default)]
    pub backtest: BacktestConfig,
}

/// Parameters feeding the risk engine. All of these affect position
/// sizing or exits, so validation never silently substitutes defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Percent of equity risked per trade (1.0 = 1%)
    #[serde(default = "default_risk_pct")]
    pub risk_pct: Decimal,
    /// ATR lookback period
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// Stop distance as a multiple of ATR
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: Decimal,
    /// Target distance as a multiple of ATR
    #[serde(default = "default_tp_atr_multiplier")]
    pub take_profit_atr_multiplier: Decimal,
    /// Smallest tradeable quantity increment on the venue
    #[serde(default = "default_qty_increment")]
    pub qty_increment: Decimal,
    /// Account equity used for sizing in paper mode
    #[serde(default = "default_initial_equity")]
    pub initial_equity: Decimal,
    /// Realized loss (absolute) that pauses entries for the day; 0 disables
    #[serde(default)]
    pub max_daily_loss: Decimal,
    /// Seconds to wait after a trade before the next entry; 0 disables
    #[serde(default)]
    pub cooldown_seconds: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_pct: default_risk_pct(),
            atr_period: default_atr_period(),
            atr_multiplier: default_atr_multiplier(),
            take_profit_atr_multiplier: default_tp_atr_multiplier(),
            qty_increment: default_qty_increment(),
            initial_equity: default_initial_equity(),
            max_daily_loss: Decimal::ZERO,
            cooldown_seconds: 0,
        }
    }
}

/// Market-data and feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Maximum outbound data calls per rate-limit window
    #[serde(default = "default_rate_limit_capacity")]
    pub rate_limit_capacity: u32,
    /// Rate-limit window length in seconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,
    /// Initial feed reconnect delay in seconds
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_secs: u64,
    /// Maximum feed reconnect delay in seconds
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,
    /// Websocket URL for the streaming tick feed
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// REST base URL for candles/ticker
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            rate_limit_capacity: default_rate_limit_capacity(),
            rate_limit_window_secs: default_rate_limit_window(),
            backoff_initial_secs: default_backoff_initial(),
            backoff_max_secs: default_backoff_max(),
            feed_url: default_feed_url(),
            rest_url: default_rest_url(),
        }
    }
}

/// Backtest simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Execution-price disadvantage in percent (0.05 = 0.05%)
    #[serde(default = "default_slippage_pct")]
    pub slippage_pct: Decimal,
    /// Taker fee on notional in percent
    #[serde(default = "default_fee_pct")]
    pub fee_pct: Decimal,
    /// Fill simulated entries/exits at the bar open or close
    #[serde(default)]
    pub fill_point: FillPoint,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            slippage_pct: default_slippage_pct(),
            fee_pct: default_fee_pct(),
            fill_point: FillPoint::default(),
        }
    }
}

/// Which bar price simulated fills execute at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPoint {
    Open,
    #[default]
    Close,
}

fn default_mode() -> Mode {
    Mode::Paper
}

fn default_symbol() -> String {
    "BTC/USD".to_string()
}

fn default_timeframe() -> String {
    "5m".to_string()
}

fn default_lookback() -> u32 {
    120
}

fn default_strategy() -> String {
    "momentum".to_string()
}

fn default_poll_seconds() -> u64 {
    5
}

fn default_risk_pct() -> Decimal {
    Decimal::ONE
}

fn default_atr_period() -> usize {
    14
}

fn default_atr_multiplier() -> Decimal {
    Decimal::TWO
}

fn default_tp_atr_multiplier() -> Decimal {
    Decimal::from(3)
}

fn default_qty_increment() -> Decimal {
    Decimal::new(1, 6) // 0.000001
}

fn default_initial_equity() -> Decimal {
    Decimal::from(10_000)
}

fn default_rate_limit_capacity() -> u32 {
    10
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_backoff_initial() -> u64 {
    1
}

fn default_backoff_max() -> u64 {
    60
}

fn default_feed_url() -> String {
    "wss://ws-feed.exchange.coinbase.com".to_string()
}

fn default_rest_url() -> String {
    "https://api.exchange.coinbase.com".to_string()
}

fn default_slippage_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05%
}

fn default_fee_pct() -> Decimal {
    Decimal::new(1, 1) // 0.1%
}

impl AppConfig {
    /// Validate risk-affecting parameters. Fails fast at startup; the
    /// engine never substitutes silent defaults for a bad value.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(EngineError::Configuration("symbol must not be empty".into()));
        }
        if self.poll_seconds == 0 {
            return Err(EngineError::Configuration(
                "poll_seconds must be positive".into(),
            ));
        }
        if self.lookback <= self.risk.atr_period as u32 {
            return Err(EngineError::Configuration(format!(
                "lookback ({}) must exceed atr_period ({})",
                self.lookback, self.risk.atr_period
            )));
        }
        if self.risk.risk_pct <= Decimal::ZERO || self.risk.risk_pct > Decimal::from(100) {
            return Err(EngineError::Configuration(format!(
                "risk_pct must be in (0, 100], got {}",
                self.risk.risk_pct
            )));
        }
        if self.risk.atr_period < 2 {
            return Err(EngineError::Configuration(
                "atr_period must be at least 2".into(),
            ));
        }
        if self.risk.atr_multiplier <= Decimal::ZERO
            || self.risk.take_profit_atr_multiplier <= Decimal::ZERO
        {
            return Err(EngineError::Configuration(
                "ATR multipliers must be positive".into(),
            ));
        }
        if self.risk.qty_increment <= Decimal::ZERO {
            return Err(EngineError::Configuration(
                "qty_increment must be positive".into(),
            ));
        }
        if self.risk.initial_equity <= Decimal::ZERO {
            return Err(EngineError::Configuration(
                "initial_equity must be positive".into(),
            ));
        }
        if self.data.rate_limit_capacity == 0 || self.data.rate_limit_window_secs == 0 {
            return Err(EngineError::Configuration(
                "rate limit capacity and window must be positive".into(),
            ));
        }
        if self.data.backoff_initial_secs == 0
            || self.data.backoff_max_secs < self.data.backoff_initial_secs
        {
            return Err(EngineError::Configuration(
                "backoff_initial must be positive and no greater than backoff_max".into(),
            ));
        }
        if self.backtest.slippage_pct < Decimal::ZERO || self.backtest.fee_pct < Decimal::ZERO {
            return Err(EngineError::Configuration(
                "slippage_pct and fee_pct must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            symbol: default_symbol(),
            timeframe: default_timeframe(),
            lookback: default_lookback(),
            strategy: default_strategy(),
            poll_seconds: default_poll_seconds(),
            risk: RiskConfig::default(),
            data: DataConfig::default(),
            backtest: BacktestConfig::default(),
        }
    }
}
