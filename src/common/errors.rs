//! Error types for the engine

use thiserror::Error;

/// Result type alias using our EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Transient market-data failure; retried on the next poll cycle
    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    /// Exchange declined an order; recorded as a failed order
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Exchange collaborator failure (opaque, never inspected further)
    #[error("exchange error: {0}")]
    Exchange(String),

    /// Streaming feed lost its connection; surfaced via FeedHealth only
    #[error("price feed disconnected: {0}")]
    FeedDisconnected(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Invalid or malformed configuration; fatal at startup
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for EngineError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        EngineError::FeedDisconnected(err.to_string())
    }
}

impl EngineError {
    /// Whether the error is recoverable within the runner loop
    /// (logged and retried next cycle) rather than fatal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_errors_are_fatal() {
        assert!(!EngineError::Configuration("bad".to_string()).is_recoverable());
        assert!(EngineError::TransientFetch("timeout".to_string()).is_recoverable());
        assert!(EngineError::OrderRejected("declined".to_string()).is_recoverable());
        assert!(EngineError::FeedDisconnected("reset".to_string()).is_recoverable());
        assert!(EngineError::Exchange("maintenance".to_string()).is_recoverable());
    }
}
