//! Market-data collaborators
//!
//! The engine never talks to a brokerage or market-data vendor directly;
//! it consumes the narrow traits here, injected at construction. A
//! failed lookup degrades the dependent metric to an omitted value, so
//! implementations should return `Err` freely rather than fabricate.

pub mod memory;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::reports::performance::Period;

/// A single dividend payment event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendEvent {
    pub amount: Decimal,
    pub ex_date: NaiveDate,
}

/// Current and historical prices for a symbol.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest price, or `None` when the source has no quote for the symbol.
    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>>;

    /// Ordered periodic return series (fractions, oldest first) covering
    /// the requested period. Empty when no history exists.
    async fn historical_returns(&self, symbol: &str, period: Period) -> Result<Vec<f64>>;
}

/// Dividend event history for a symbol.
#[async_trait]
pub trait DividendSource: Send + Sync {
    async fn events(&self, symbol: &str, since: NaiveDate) -> Result<Vec<DividendEvent>>;
}

/// Maps internal asset ids to market symbols.
pub trait AssetRegistry: Send + Sync {
    fn symbol(&self, asset_id: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    price: Decimal,
    timestamp: chrono::DateTime<Utc>,
}

/// Price source wrapper with a TTL cache on current-price lookups.
///
/// Historical series pass straight through; only spot quotes are worth
/// caching at report granularity.
pub struct CachedPriceSource<P> {
    inner: P,
    cache: Mutex<HashMap<String, CacheEntry>>,
    cache_ttl_hours: i64,
}

impl<P> CachedPriceSource<P> {
    pub fn new(inner: P, cache_ttl_hours: i64) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            cache_ttl_hours,
        }
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

#[async_trait]
impl<P: PriceSource> PriceSource for CachedPriceSource<P> {
    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.get(symbol) {
                let age = Utc::now().signed_duration_since(entry.timestamp);
                if age < Duration::hours(self.cache_ttl_hours) {
                    debug!(symbol, age_hours = age.num_hours(), "using cached price");
                    return Ok(Some(entry.price));
                }
            }
        }

        let price = self.inner.current_price(symbol).await?;
        if let Some(price) = price {
            let mut cache = self.cache.lock().await;
            cache.insert(
                symbol.to_string(),
                CacheEntry {
                    price,
                    timestamp: Utc::now(),
                },
            );
        }
        Ok(price)
    }

    async fn historical_returns(&self, symbol: &str, period: Period) -> Result<Vec<f64>> {
        self.inner.historical_returns(symbol, period).await
    }
}
