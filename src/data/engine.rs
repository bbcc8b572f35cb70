//! Bounded-staleness market-data cache in front of the exchange
//!
//! OHLCV responses are cached per (symbol, timeframe) with a ttl equal to
//! the poll interval. Cache misses go through the rate limiter and a
//! per-key coalescing lock, so concurrent callers for the same key issue
//! at most one underlying fetch. A failed fetch surfaces the error and
//! leaves the previous entry untouched; serving stale-but-known-good data
//! is the caller's decision via `get_cached`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::rate_limiter::RateLimiter;
use crate::common::errors::Result;
use crate::common::traits::Exchange;
use crate::common::types::{Bar, Tick};

type CacheKey = (String, String);

/// One cached OHLCV series
#[derive(Debug, Clone)]
struct CacheEntry {
    bars: Vec<Bar>,
    fetched_at: Instant,
}

/// Cache + rate limiter + fetch orchestration
pub struct DataEngine {
    exchange: Arc<dyn Exchange>,
    limiter: RateLimiter,
    ttl: Duration,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
    /// Per-key coalescing locks: holders of a key's lock are the only
    /// task allowed to refresh that key
    inflight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    latest_tick: SyncMutex<Option<Tick>>,
}

impl DataEngine {
    pub fn new(exchange: Arc<dyn Exchange>, limiter: RateLimiter, ttl: Duration) -> Self {
        Self {
            exchange,
            limiter,
            ttl,
            cache: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            latest_tick: SyncMutex::new(None),
        }
    }

    /// Fetch bars, served from cache while fresher than the ttl
    pub async fn get_ohlcv(&self, symbol: &str, timeframe: &str, lookback: u32) -> Result<Vec<Bar>> {
        let key: CacheKey = (symbol.to_string(), timeframe.to_string());

        if let Some(bars) = self.fresh_entry(&key).await {
            return Ok(bars);
        }

        let key_lock = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = key_lock.lock().await;

        // A coalesced waiter may find the cache already refreshed
        if let Some(bars) = self.fresh_entry(&key).await {
            debug!(symbol, timeframe, "coalesced into a completed fetch");
            return Ok(bars);
        }

        self.limiter.acquire().await;
        match self.exchange.fetch_ohlcv(symbol, timeframe, lookback).await {
            Ok(bars) => {
                let mut cache = self.cache.lock().await;
                cache.insert(
                    key,
                    CacheEntry {
                        bars: bars.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Ok(bars)
            }
            Err(err) => {
                warn!(symbol, timeframe, %err, "OHLCV fetch failed, cache left intact");
                Err(err)
            }
        }
    }

    /// Last known bars for the key regardless of staleness
    pub async fn get_cached(&self, symbol: &str, timeframe: &str) -> Option<Vec<Bar>> {
        let key: CacheKey = (symbol.to_string(), timeframe.to_string());
        let cache = self.cache.lock().await;
        cache.get(&key).map(|entry| entry.bars.clone())
    }

    /// Record a streaming tick for intra-cycle mark-to-market
    pub fn record_tick(&self, tick: Tick) {
        let mut latest = self.latest_tick.lock().expect("tick lock poisoned");
        *latest = Some(tick);
    }

    /// Most recent streaming tick, if any has arrived
    pub fn latest_tick(&self) -> Option<Tick> {
        self.latest_tick.lock().expect("tick lock poisoned").clone()
    }

    async fn fresh_entry(&self, key: &CacheKey) -> Option<Vec<Bar>> {
        let cache = self.cache.lock().await;
        cache.get(key).and_then(|entry| {
            if entry.fetched_at.elapsed() < self.ttl {
                Some(entry.bars.clone())
            } else {
                None
            }
        })
    }
}
