//! Market-data plumbing: rate limiting, caching and the streaming feed

pub mod engine;
pub mod feed;
pub mod rate_limiter;
pub mod ws;

pub use engine::DataEngine;
pub use feed::{Backoff, FeedHandle, FeedHealth, FeedState, PriceFeed, TickStream, TickTransport};
pub use rate_limiter::RateLimiter;
pub use ws::CoinbaseTransport;
