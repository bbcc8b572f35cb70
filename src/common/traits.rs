//! Collaborator traits at the engine boundary
//!
//! The core never talks to a concrete exchange or storage backend; it
//! consumes these traits. Failures from either boundary collapse into the
//! single `EngineError` taxonomy and are never inspected further.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::errors::Result;
use super::types::{Bar, Order, OrderType, Position, Side, Tick};

/// Market-data and order-routing collaborator (CCXT-like surface)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Fetch up to `lookback` most recent bars, oldest first
    async fn fetch_ohlcv(&self, symbol: &str, timeframe: &str, lookback: u32) -> Result<Vec<Bar>>;

    /// Fetch the latest traded price
    async fn fetch_ticker(&self, symbol: &str) -> Result<Tick>;

    /// Submit an order; the returned record carries a terminal status
    async fn create_order(
        &self,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Result<Order>;
}

/// Session state restored by the persistence collaborator at startup
#[derive(Debug, Clone, Default)]
pub struct StoredState {
    pub position: Option<Position>,
    pub daily_pnl: Decimal,
}

/// Persistence collaborator. Called synchronously after state
/// transitions; the core does not depend on the storage format.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_order(&self, order: &Order) -> Result<()>;

    /// Persist the position snapshot; a zero-quantity snapshot marks a close
    async fn save_position(&self, position: &Position) -> Result<()>;

    async fn record_daily_pnl(&self, date: NaiveDate, pnl: Decimal) -> Result<()>;

    async fn load_state(&self) -> Result<StoredState>;
}

/// In-memory store: the default for paper sessions and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: Mutex<Vec<Order>>,
    positions: Mutex<HashMap<String, Position>>,
    daily_pnl: Mutex<HashMap<NaiveDate, Decimal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.orders.lock().await.clone()
    }

    pub async fn daily_pnl(&self, date: NaiveDate) -> Decimal {
        self.daily_pnl
            .lock()
            .await
            .get(&date)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save_order(&self, order: &Order) -> Result<()> {
        self.orders.lock().await.push(order.clone());
        Ok(())
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        let mut positions = self.positions.lock().await;
        if position.quantity.is_zero() {
            positions.remove(&position.symbol);
        } else {
            positions.insert(position.symbol.clone(), position.clone());
        }
        Ok(())
    }

    async fn record_daily_pnl(&self, date: NaiveDate, pnl: Decimal) -> Result<()> {
        self.daily_pnl.lock().await.insert(date, pnl);
        Ok(())
    }

    async fn load_state(&self) -> Result<StoredState> {
        let positions = self.positions.lock().await;
        let position = positions.values().next().cloned();
        Ok(StoredState {
            position,
            daily_pnl: Decimal::ZERO,
        })
    }
}
