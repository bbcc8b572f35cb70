//! Websocket tick transport for the Coinbase public ticker channel

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};

use super::feed::{TickStream, TickTransport};
use crate::common::errors::{EngineError, Result};
use crate::common::types::Tick;

/// Transport subscribing to the public `ticker` channel for one product
pub struct CoinbaseTransport {
    url: String,
    product_id: String,
}

impl CoinbaseTransport {
    /// `symbol` uses the engine's "BTC/USD" form; the wire wants "BTC-USD"
    pub fn new(url: impl Into<String>, symbol: &str) -> Self {
        Self {
            url: url.into(),
            product_id: symbol.replace('/', "-"),
        }
    }

    /// Parse one text frame into a tick; non-ticker frames yield `None`
    fn parse_ticker(text: &str) -> Option<Tick> {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        if value.get("type").and_then(|v| v.as_str()) != Some("ticker") {
            return None;
        }
        let price: Decimal = value.get("price")?.as_str()?.parse().ok()?;
        let timestamp = value
            .get("time")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let volume = value
            .get("last_size")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok());
        Some(Tick {
            timestamp,
            price,
            volume,
        })
    }
}

#[async_trait::async_trait]
impl TickTransport for CoinbaseTransport {
    async fn connect(&self) -> Result<TickStream> {
        info!(url = %self.url, product = %self.product_id, "connecting tick transport");
        let (ws_stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| EngineError::FeedDisconnected(e.to_string()))?;
        let (mut write, read) = ws_stream.split();

        let subscribe = json!({
            "type": "subscribe",
            "product_ids": [self.product_id],
            "channels": ["ticker"],
        });
        write.send(Message::Text(subscribe.to_string())).await?;
        debug!("ticker subscription sent");

        // The write half rides along in the stream state so the
        // connection stays open for the lifetime of the reader.
        let stream = futures_util::stream::unfold((read, write), |(mut read, write)| async move {
            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(tick) = CoinbaseTransport::parse_ticker(&text) {
                            return Some((Ok(tick), (read, write)));
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        warn!(?frame, "tick transport closed by server");
                        return None;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        return Some((Err(err.into()), (read, write)));
                    }
                    None => return None,
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_ticker_frame() {
        let json = r#"{
            "type": "ticker",
            "product_id": "BTC-USD",
            "price": "65000.12",
            "last_size": "0.005",
            "time": "2024-03-01T12:00:00.000000Z"
        }"#;
        let tick = CoinbaseTransport::parse_ticker(json).unwrap();
        assert_eq!(tick.price, dec!(65000.12));
        assert_eq!(tick.volume, Some(dec!(0.005)));
    }

    #[test]
    fn ignores_non_ticker_frames() {
        assert!(CoinbaseTransport::parse_ticker(r#"{"type":"subscriptions"}"#).is_none());
        assert!(CoinbaseTransport::parse_ticker(r#"{"type":"heartbeat"}"#).is_none());
        assert!(CoinbaseTransport::parse_ticker("not json").is_none());
    }

    #[test]
    fn symbol_maps_to_product_id() {
        let transport = CoinbaseTransport::new("wss://example", "ETH/USD");
        assert_eq!(transport.product_id, "ETH-USD");
    }
}
