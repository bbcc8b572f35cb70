//! Simulated order routing for paper sessions
//!
//! Market data passes through to an inner adapter; orders fill
//! immediately at the caller's reference price. Tests can inject a
//! one-shot rejection to exercise the failed-order path.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::common::errors::{EngineError, Result};
use crate::common::traits::Exchange;
use crate::common::types::{Bar, Order, OrderStatus, OrderType, Side, Tick};

pub struct PaperExchange {
    inner: Arc<dyn Exchange>,
    next_id: AtomicU64,
    fail_next: Mutex<Option<String>>,
}

impl PaperExchange {
    pub fn new(inner: Arc<dyn Exchange>) -> Self {
        Self {
            inner,
            next_id: AtomicU64::new(1),
            fail_next: Mutex::new(None),
        }
    }

    /// Make the next `create_order` fail with the given message
    pub fn fail_next_order(&self, message: impl Into<String>) {
        *self.fail_next.lock().expect("lock poisoned") = Some(message.into());
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    async fn fetch_ohlcv(&self, symbol: &str, timeframe: &str, lookback: u32) -> Result<Vec<Bar>> {
        self.inner.fetch_ohlcv(symbol, timeframe, lookback).await
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Tick> {
        self.inner.fetch_ticker(symbol).await
    }

    async fn create_order(
        &self,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Result<Order> {
        if let Some(message) = self.fail_next.lock().expect("lock poisoned").take() {
            return Err(EngineError::OrderRejected(message));
        }
        let fill_price = match price {
            Some(p) if p > Decimal::ZERO => p,
            _ => self.inner.fetch_ticker(symbol).await?.price,
        };
        let now = Utc::now();
        let order = Order {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            symbol: symbol.to_string(),
            side,
            quantity,
            order_type,
            status: OrderStatus::Filled,
            requested_at: now,
            filled_at: Some(now),
            price: fill_price,
        };
        info!(%side, %quantity, price = %fill_price, "paper order filled");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct StubData;

    #[async_trait]
    impl Exchange for StubData {
        async fn fetch_ohlcv(&self, _: &str, _: &str, _: u32) -> Result<Vec<Bar>> {
            Ok(Vec::new())
        }

        async fn fetch_ticker(&self, _: &str) -> Result<Tick> {
            Ok(Tick {
                timestamp: Utc::now(),
                price: dec!(500),
                volume: None,
            })
        }

        async fn create_order(
            &self,
            _: &str,
            _: Side,
            _: OrderType,
            _: Decimal,
            _: Option<Decimal>,
        ) -> Result<Order> {
            unreachable!("paper exchange must not delegate orders")
        }
    }

    #[tokio::test]
    async fn fills_at_reference_price() {
        let paper = PaperExchange::new(Arc::new(StubData));
        let order = paper
            .create_order("BTC/USD", Side::Buy, OrderType::Market, dec!(1), Some(dec!(100)))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.price, dec!(100));
        assert!(order.filled_at.is_some());
    }

    #[tokio::test]
    async fn falls_back_to_ticker_without_reference() {
        let paper = PaperExchange::new(Arc::new(StubData));
        let order = paper
            .create_order("BTC/USD", Side::Sell, OrderType::Market, dec!(2), None)
            .await
            .unwrap();
        assert_eq!(order.price, dec!(500));
    }

    #[tokio::test]
    async fn injected_failure_rejects_once() {
        let paper = PaperExchange::new(Arc::new(StubData));
        paper.fail_next_order("insufficient funds");
        let err = paper
            .create_order("BTC/USD", Side::Buy, OrderType::Market, dec!(1), Some(dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::OrderRejected(_)));

        // Next submission succeeds again
        assert!(paper
            .create_order("BTC/USD", Side::Buy, OrderType::Market, dec!(1), Some(dec!(100)))
            .await
            .is_ok());
    }
}
