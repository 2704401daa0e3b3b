//! Tier 1: in-process cache using moka

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;

use crate::domain::cache::{CacheEntry, CacheTier, PurgeOutcome, TierKind};
use crate::domain::DomainError;

/// Configuration for the in-memory tier
#[derive(Debug, Clone)]
pub struct InMemoryTierConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Hard upper bound on residency, regardless of entry expiry
    pub max_ttl: Duration,
}

impl Default for InMemoryTierConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            max_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

impl InMemoryTierConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }
}

/// Bounded in-process tier.
///
/// Moka evicts by capacity; logical expiry stays on each entry's
/// `expires_at` so a simulated clock ages this tier like the others.
#[derive(Debug, Clone)]
pub struct InMemoryTier {
    cache: MokaCache<String, CacheEntry>,
}

impl InMemoryTier {
    pub fn new() -> Self {
        Self::with_config(InMemoryTierConfig::default())
    }

    pub fn with_config(config: InMemoryTierConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.max_ttl)
            .build();

        Self { cache }
    }
}

impl Default for InMemoryTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheTier for InMemoryTier {
    fn kind(&self) -> TierKind {
        TierKind::Memory
    }

    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, DomainError> {
        Ok(self.cache.get(key).await)
    }

    async fn put_entry(
        &self,
        key: &str,
        entry: &CacheEntry,
        _ttl: Duration,
    ) -> Result<(), DomainError> {
        self.cache.insert(key.to_string(), entry.clone()).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeOutcome, DomainError> {
        self.cache.run_pending_tasks().await;

        let expired: Vec<(String, u64)> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, entry)| (key.as_ref().clone(), entry.size_bytes()))
            .collect();

        let mut outcome = PurgeOutcome::default();
        for (key, bytes) in expired {
            if self.cache.remove(&key).await.is_some() {
                outcome.items_removed += 1;
                outcome.bytes_freed += bytes;
            }
        }

        Ok(outcome)
    }

    async fn size(&self) -> Result<usize, DomainError> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count() as usize)
    }
}
