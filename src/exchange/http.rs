//! Public REST market-data adapter (Coinbase Exchange endpoints)
//!
//! Candles and ticker only; order routing belongs to an authenticated
//! adapter that is out of scope here.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::common::errors::{EngineError, Result};
use crate::common::traits::Exchange;
use crate::common::types::{Bar, Order, OrderType, Side, Tick};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for public candles and tickers
pub struct PublicMarketData {
    client: reqwest::Client,
    base_url: String,
}

/// Candle row on the wire: [time, low, high, open, close, volume], newest first
type CandleRow = (i64, f64, f64, f64, f64, f64);

#[derive(Debug, Deserialize)]
struct TickerResponse {
    price: Decimal,
    time: DateTime<Utc>,
    #[serde(default)]
    size: Option<Decimal>,
}

impl PublicMarketData {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn product_id(symbol: &str) -> String {
        symbol.replace('/', "-")
    }

    /// Timeframe label to candle granularity in seconds
    fn granularity(timeframe: &str) -> Result<u32> {
        match timeframe {
            "1m" => Ok(60),
            "5m" => Ok(300),
            "15m" => Ok(900),
            "1h" => Ok(3600),
            "6h" => Ok(21_600),
            "1d" => Ok(86_400),
            other => Err(EngineError::Configuration(format!(
                "unsupported timeframe '{other}'"
            ))),
        }
    }

    fn decimal(value: f64) -> Result<Decimal> {
        Decimal::from_f64_retain(value)
            .ok_or_else(|| EngineError::Exchange(format!("non-finite price value {value}")))
    }

    fn row_to_bar(row: CandleRow) -> Result<Bar> {
        let (time, low, high, open, close, volume) = row;
        let timestamp = Utc
            .timestamp_opt(time, 0)
            .single()
            .ok_or_else(|| EngineError::Exchange(format!("invalid candle timestamp {time}")))?;
        Ok(Bar {
            timestamp,
            open: Self::decimal(open)?,
            high: Self::decimal(high)?,
            low: Self::decimal(low)?,
            close: Self::decimal(close)?,
            volume: Self::decimal(volume)?,
        })
    }
}

#[async_trait]
impl Exchange for PublicMarketData {
    async fn fetch_ohlcv(&self, symbol: &str, timeframe: &str, lookback: u32) -> Result<Vec<Bar>> {
        let granularity = Self::granularity(timeframe)?;
        let url = format!(
            "{}/products/{}/candles",
            self.base_url,
            Self::product_id(symbol)
        );
        debug!(%url, granularity, "fetching candles");
        let rows: Vec<CandleRow> = self
            .client
            .get(&url)
            .query(&[("granularity", granularity)])
            .send()
            .await
            .map_err(|e| EngineError::TransientFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::TransientFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| EngineError::TransientFetch(e.to_string()))?;

        // Wire order is newest first; the engine wants oldest first
        let mut bars = rows
            .into_iter()
            .map(Self::row_to_bar)
            .collect::<Result<Vec<_>>>()?;
        bars.sort_by_key(|bar| bar.timestamp);
        bars.dedup_by_key(|bar| bar.timestamp);
        if bars.len() > lookback as usize {
            let skip = bars.len() - lookback as usize;
            bars.drain(..skip);
        }
        Ok(bars)
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Tick> {
        let url = format!(
            "{}/products/{}/ticker",
            self.base_url,
            Self::product_id(symbol)
        );
        let ticker: TickerResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::TransientFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::TransientFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| EngineError::TransientFetch(e.to_string()))?;
        Ok(Tick {
            timestamp: ticker.time,
            price: ticker.price,
            volume: ticker.size,
        })
    }

    async fn create_order(
        &self,
        _symbol: &str,
        _side: Side,
        _order_type: OrderType,
        _quantity: Decimal,
        _price: Option<Decimal>,
    ) -> Result<Order> {
        Err(EngineError::OrderRejected(
            "public market-data adapter cannot route orders".to_string(),
        ))
    }
}
