//! Channel type definitions for inter-task communication

use tokio::sync::mpsc;

use super::events::EngineEvent;
use super::types::Tick;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new tick channel with the default buffer size.
///
/// One producer (the price feed) and one consumer (the runner); the feed
/// side uses `try_send` so a slow consumer never blocks tick delivery.
pub fn create_tick_channel() -> (mpsc::Sender<Tick>, mpsc::Receiver<Tick>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}

/// Create a new tick channel with a custom buffer size
pub fn create_tick_channel_with_size(size: usize) -> (mpsc::Sender<Tick>, mpsc::Receiver<Tick>) {
    mpsc::channel(size)
}

/// Create a new engine event channel with the default buffer size
pub fn create_event_channel() -> (mpsc::Sender<EngineEvent>, mpsc::Receiver<EngineEvent>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}
