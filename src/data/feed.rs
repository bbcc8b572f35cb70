//! Streaming price feed with reconnect, backoff and health tracking
//!
//! The feed runs as its own long-lived task. Ticks are pushed to the
//! runner over a bounded channel with `try_send`; a full channel counts a
//! dropped tick instead of blocking the transport read loop. Connection
//! state, last tick time, backoff stage and the drop counter are exposed
//! through [`FeedHealth`] so staleness is detectable independently of the
//! runner's polling cadence.

use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::common::errors::Result;
use crate::common::types::Tick;

/// How long a connection must stay up before the backoff resets
pub const STABILITY_THRESHOLD: Duration = Duration::from_secs(30);

/// Feed connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Connected,
}

/// Health signal exposed to the runner
#[derive(Debug, Clone)]
pub struct FeedHealth {
    pub state: FeedState,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub backoff_stage: u32,
    pub dropped_ticks: u64,
}

impl Default for FeedHealth {
    fn default() -> Self {
        Self {
            state: FeedState::Disconnected,
            last_tick_at: None,
            backoff_stage: 0,
            dropped_ticks: 0,
        }
    }
}

/// Deterministic exponential backoff: initial, doubling, capped.
///
/// After k consecutive failures the scheduled delay is
/// `min(initial * 2^(k-1), max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    stage: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            stage: 0,
        }
    }

    /// Delay for the next reconnect attempt; increments the stage
    pub fn next_delay(&mut self) -> Duration {
        let delay = self
            .initial
            .saturating_mul(2u32.saturating_pow(self.stage))
            .min(self.max);
        self.stage = self.stage.saturating_add(1);
        delay
    }

    /// Reset after a connection that outlived the stability threshold
    pub fn reset(&mut self) {
        self.stage = 0;
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }
}

/// Stream of parsed ticks from one transport connection
pub type TickStream = Pin<Box<dyn Stream<Item = Result<Tick>> + Send>>;

/// Pluggable transport: one `connect` per connection attempt
#[async_trait::async_trait]
pub trait TickTransport: Send + Sync {
    async fn connect(&self) -> Result<TickStream>;
}

/// Handle for observing and stopping a running feed
#[derive(Clone)]
pub struct FeedHandle {
    health: Arc<SyncMutex<FeedHealth>>,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl FeedHandle {
    pub fn health(&self) -> FeedHealth {
        self.health.lock().expect("health lock poisoned").clone()
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// The streaming feed task
pub struct PriceFeed {
    transport: Arc<dyn TickTransport>,
    sender: mpsc::Sender<Tick>,
    backoff: Backoff,
    health: Arc<SyncMutex<FeedHealth>>,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl PriceFeed {
    pub fn new(
        transport: Arc<dyn TickTransport>,
        sender: mpsc::Sender<Tick>,
        backoff: Backoff,
    ) -> Self {
        Self {
            transport,
            sender,
            backoff,
            health: Arc::new(SyncMutex::new(FeedHealth::default())),
            shutdown: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> FeedHandle {
        FeedHandle {
            health: self.health.clone(),
            shutdown: self.shutdown.clone(),
            notify: self.notify.clone(),
        }
    }

    fn set_state(&self, state: FeedState) {
        let mut health = self.health.lock().expect("health lock poisoned");
        health.state = state;
    }

    fn update_health(&self, f: impl FnOnce(&mut FeedHealth)) {
        let mut health = self.health.lock().expect("health lock poisoned");
        f(&mut health);
    }

    /// Connect-deliver-reconnect loop; runs until the handle stops it
    pub async fn run(mut self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            self.set_state(FeedState::Connecting);
            match self.transport.connect().await {
                Ok(mut stream) => {
                    info!("price feed connected");
                    self.set_state(FeedState::Connected);
                    let connected_at = Instant::now();

                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(tick) => self.deliver(tick),
                            Err(err) => {
                                warn!(%err, "price feed transport error");
                                break;
                            }
                        }
                    }

                    self.set_state(FeedState::Disconnected);
                    if connected_at.elapsed() >= STABILITY_THRESHOLD {
                        self.backoff.reset();
                    }
                }
                Err(err) => {
                    warn!(%err, "price feed connection failed");
                    self.set_state(FeedState::Disconnected);
                }
            }

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let delay = self.backoff.next_delay();
            self.update_health(|h| h.backoff_stage = self.backoff.stage());
            debug!(?delay, "price feed reconnecting after backoff");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.notify.notified() => {}
            }
        }
        info!("price feed stopped");
    }

    /// Non-blocking push; a slow consumer costs dropped ticks, never a stall
    fn deliver(&self, tick: Tick) {
        let timestamp = tick.timestamp;
        match self.sender.try_send(tick) {
            Ok(()) => self.update_health(|h| h.last_tick_at = Some(timestamp)),
            Err(_) => self.update_health(|h| {
                h.dropped_ticks += 1;
            }),
        }
    }
}
