//! Typed engine events and the bounded, fire-and-forget event bus
//!
//! Consumers (UI, logging, persistence mirrors) subscribe to the receiving
//! end of the channel. Emission never blocks the trading path: a full
//! channel drops the event and logs it. Events of the same variant are
//! delivered in emission order; ordering across variants is not guaranteed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use super::types::{Order, Position, Signal};

/// Events emitted by the runner and backtest paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// An order was submitted (terminal status already recorded)
    OrderPlaced(Order),
    /// The open position changed; `None` means flat
    PositionUpdated(Option<Position>),
    /// Latest observed price for the instrument
    PriceUpdated {
        symbol: String,
        price: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Strategy evaluation result for the cycle
    StrategySignal {
        strategy: String,
        signal: Signal,
        price: Decimal,
    },
    /// Kill switch engaged; any open position is being flattened
    EmergencyStop { symbol: String },
}

/// Bounded fire-and-forget event publisher
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: mpsc::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(sender: mpsc::Sender<EngineEvent>) -> Self {
        Self { sender }
    }

    /// Create a bus and its subscriber end with the given buffer size
    pub fn bounded(size: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(size);
        (Self::new(tx), rx)
    }

    /// Emit an event without blocking. Overflow drops the event; the
    /// trading path never waits on a slow consumer.
    pub fn emit(&self, event: EngineEvent) {
        if let Err(err) = self.sender.try_send(event) {
            warn!("event dropped: {err}");
        }
    }
}
