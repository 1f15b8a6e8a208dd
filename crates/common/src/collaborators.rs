use std::time::Duration;

use async_trait::async_trait;

use crate::{Candle, Result};

/// Expiring string key/value state. Backed either in-process or by a
/// networked store; callers cannot tell which.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key. `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Short backend name for health output and logs.
    fn backend(&self) -> &'static str;
}

/// Source of recent closed OHLC bars.
#[async_trait]
pub trait PriceHistory: Send + Sync {
    /// Fetch at least `count` bars for `symbol` on kline `interval`
    /// (e.g. "15m"), oldest first, with the still-forming bar removed.
    ///
    /// Fails with `Error::DataUnavailable` when the upstream response is not
    /// a well-formed bar array.
    async fn recent_candles(&self, symbol: &str, interval: &str, count: usize)
        -> Result<Vec<Candle>>;
}

/// Whether a message actually went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Credentials are not configured; nothing was attempted.
    Skipped,
}

/// Outbound operator notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<Delivery>;

    /// False when credentials are missing and `send` is a no-op.
    fn is_configured(&self) -> bool;
}
