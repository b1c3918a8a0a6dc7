use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;

use crate::models::{PricePoint, TokenAddress};

/// A cached price and the monotonic instant after which it is stale.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: TokenAddress,
    pub value: PricePoint,
    pub expires_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(key: TokenAddress, value: PricePoint, ttl: Duration) -> Self {
        Self {
            key,
            value,
            expires_at: Instant::now() + ttl,
            ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Lets every entry carry its own TTL; an update restarts the clock.
struct PerEntryTtl;

impl Expiry<TokenAddress, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &TokenAddress,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &TokenAddress,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-scoped, time-bounded price cache.
///
/// Safe to share between concurrent resolution calls (clone is cheap, all clones
/// see the same entries). Expired entries read as absent and are dropped on the
/// access that finds them; [`PriceCache::evict_expired`] sweeps the rest.
#[derive(Clone)]
pub struct PriceCache {
    entries: Cache<TokenAddress, CacheEntry>,
}

impl PriceCache {
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { entries }
    }

    pub async fn get(&self, key: &TokenAddress) -> Option<PricePoint> {
        let entry = self.entries.get(key).await?;

        // moka's expiry runs on its own housekeeping clock; the entry's deadline is authoritative
        if entry.is_expired(Instant::now()) {
            self.entries.invalidate(key).await;
            return None;
        }

        Some(entry.value)
    }

    pub async fn set(&self, key: TokenAddress, value: PricePoint, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }

        self.entries
            .insert(key, CacheEntry::new(key, value, ttl))
            .await;
    }

    pub async fn evict_expired(&self) {
        self.entries.run_pending_tasks().await;
    }

    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    /// Number of live entries. Accurate after [`PriceCache::evict_expired`].
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
