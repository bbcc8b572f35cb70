//! Exchange adapters behind the `Exchange` trait

pub mod http;
pub mod paper;

pub use http::PublicMarketData;
pub use paper::PaperExchange;
