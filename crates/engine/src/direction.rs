use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use common::{normalize_symbol, KeyValueStore, Result, Side};

/// Last known higher-timeframe direction per symbol, on top of any
/// `KeyValueStore` backend.
///
/// Reads never fail: a backend error is logged and treated as "no record".
/// Writes propagate backend errors to the caller.
#[derive(Clone)]
pub struct DirectionStore {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl DirectionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub fn key(symbol: &str) -> String {
        format!("dir4h:{}", normalize_symbol(symbol))
    }

    pub fn backend(&self) -> &'static str {
        self.kv.backend()
    }

    pub async fn get(&self, symbol: &str) -> Option<Side> {
        let key = Self::key(symbol);
        match self.kv.get(&key).await {
            Ok(Some(raw)) => {
                let side = Side::from_stored(&raw);
                if side.is_none() {
                    warn!(%key, value = %raw, "Ignoring unrecognized stored direction");
                }
                side
            }
            Ok(None) => None,
            Err(e) => {
                warn!(%key, error = %e, "Direction lookup failed, treating as absent");
                None
            }
        }
    }

    pub async fn set(&self, symbol: &str, side: Side) -> Result<()> {
        let key = Self::key(symbol);
        self.kv.set(&key, side.as_str(), self.ttl).await?;
        info!(%key, %side, ttl_secs = self.ttl.as_secs(), "Recorded 4H direction");
        Ok(())
    }
}
