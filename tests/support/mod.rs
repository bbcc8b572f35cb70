#![allow(dead_code)]
//! Hand-rolled fakes and bar builders shared by the integration tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ebbtide::{
    Bar, EngineError, Exchange, Order, OrderStatus, OrderType, Result, Side, Tick,
};

/// Scriptable exchange fake: serves a fixed bar series, fills orders at
/// the reference price and records everything it is asked to do.
pub struct FakeExchange {
    bars: Mutex<Vec<Bar>>,
    orders: Mutex<Vec<Order>>,
    reject_orders: AtomicBool,
    fail_fetches: AtomicBool,
    fetch_count: AtomicUsize,
    fetch_delay: Duration,
    next_id: AtomicU64,
}

impl FakeExchange {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            bars: Mutex::new(bars),
            orders: Mutex::new(Vec::new()),
            reject_orders: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            fetch_count: AtomicUsize::new(0),
            fetch_delay: Duration::ZERO,
            next_id: AtomicU64::new(1),
        }
    }

    /// Simulate network latency inside each OHLCV fetch
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn set_bars(&self, bars: Vec<Bar>) {
        *self.bars.lock().unwrap() = bars;
    }

    pub fn reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exchange for FakeExchange {
    async fn fetch_ohlcv(&self, _symbol: &str, _timeframe: &str, _lookback: u32) -> Result<Vec<Bar>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(EngineError::TransientFetch("scripted outage".to_string()));
        }
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        let bars = self.bars.lock().unwrap().clone();
        Ok(bars)
    }

    async fn fetch_ticker(&self, _symbol: &str) -> Result<Tick> {
        let last = {
            let bars = self.bars.lock().unwrap();
            bars.last().cloned()
        };
        let last = last.ok_or_else(|| EngineError::TransientFetch("no bars scripted".to_string()))?;
        Ok(Tick {
            timestamp: last.timestamp,
            price: last.close,
            volume: None,
        })
    }

    async fn create_order(
        &self,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Result<Order> {
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(EngineError::OrderRejected("scripted rejection".to_string()));
        }
        let fill_price = match price {
            Some(p) => p,
            None => self.fetch_ticker(symbol).await?.price,
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
        self.orders.lock().unwrap().push(order.clone());
        Ok(order)
    }
}

/// A bar with an explicit range, one minute apart
pub fn bar(index: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Bar {
    Bar {
        timestamp: Utc.timestamp_opt(index * 60, 0).unwrap(),
        open,
        high,
        low,
        close,
        volume: Decimal::ONE,
    }
}

/// Flat bars (open=high=low=close) from integer closes
pub fn flat_bars(closes: &[i64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let price = Decimal::from(c);
            bar(i as i64, price, price, price, price)
        })
        .collect()
}

/// Closes rising one unit per bar starting at 100: momentum buys after
/// warmup and the ATR settles at exactly 1.
pub fn rising_bars(len: i64) -> Vec<Bar> {
    flat_bars(&(100..100 + len).collect::<Vec<_>>())
}
