//! Cache-aside store layered over memory, shared and durable tiers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::cache::{
    CacheEntry, CacheKey, CacheNamespace, CacheStats, CacheTier, CleanupReport, TierBreakdown,
    TierCleanup, TierKind,
};
use crate::domain::Clock;
use crate::infrastructure::observability::{record_cache_lookup, record_cache_tier_error};

/// Entry lifetimes per namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub geocode: Duration,
    pub distance: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            geocode: Duration::from_secs(7 * 24 * 3600),
            distance: Duration::from_secs(3600),
        }
    }
}

impl CacheTtls {
    pub fn for_namespace(&self, namespace: CacheNamespace) -> Duration {
        match namespace {
            CacheNamespace::Geocode => self.geocode,
            CacheNamespace::Distance => self.distance,
        }
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    memory_hits: AtomicU64,
    shared_hits: AtomicU64,
    durable_hits: AtomicU64,
    misses: AtomicU64,
    tier_errors: AtomicU64,
}

impl CacheCounters {
    fn record_hit(&self, tier: TierKind) {
        let counter = match tier {
            TierKind::Memory => &self.memory_hits,
            TierKind::Shared => &self.shared_hits,
            TierKind::Durable => &self.durable_hits,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn hits(&self) -> TierBreakdown {
        TierBreakdown {
            memory: self.memory_hits.load(Ordering::Relaxed),
            shared: self.shared_hits.load(Ordering::Relaxed),
            durable: self.durable_hits.load(Ordering::Relaxed),
        }
    }
}

/// Multi-tier cache for geocode and distance results.
///
/// Reads walk the tiers fastest first and promote hits to the faster tiers
/// with their remaining TTL. Tier failures are logged and treated as misses;
/// no operation ever returns an error to the caller.
#[derive(Debug)]
pub struct MultiTierCache {
    tiers: Vec<Arc<dyn CacheTier>>,
    clock: Arc<dyn Clock>,
    ttls: CacheTtls,
    counters: CacheCounters,
}

impl MultiTierCache {
    pub fn new(mut tiers: Vec<Arc<dyn CacheTier>>, clock: Arc<dyn Clock>, ttls: CacheTtls) -> Self {
        tiers.sort_by_key(|t| t.kind() as u8);

        Self {
            tiers,
            clock,
            ttls,
            counters: CacheCounters::default(),
        }
    }

    pub fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    pub fn tier_kinds(&self) -> Vec<TierKind> {
        self.tiers.iter().map(|t| t.kind()).collect()
    }

    /// Looks a key up, returning `None` on a miss in every tier
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let now = self.clock.now();
        let namespace = key.namespace().as_str();

        for (index, tier) in self.tiers.iter().enumerate() {
            let entry = match tier.get_entry(key.as_str()).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    self.tier_failed(tier.kind(), "get", &e.to_string());
                    continue;
                }
            };

            if entry.is_expired(now) {
                debug!(key = %key, tier = %tier.kind(), "Dropping expired cache entry");
                if let Err(e) = tier.delete(key.as_str()).await {
                    self.tier_failed(tier.kind(), "delete", &e.to_string());
                }
                continue;
            }

            let value = match serde_json::from_str::<T>(&entry.data) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %key, tier = %tier.kind(), error = %e, "Discarding undecodable cache entry");
                    if let Err(e) = tier.delete(key.as_str()).await {
                        self.tier_failed(tier.kind(), "delete", &e.to_string());
                    }
                    continue;
                }
            };

            self.counters.record_hit(tier.kind());
            record_cache_lookup(namespace, tier.kind().as_str());

            if index > 0 {
                self.promote(key, &entry, &self.tiers[..index]).await;
            }

            return Some(value);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        record_cache_lookup(namespace, "miss");
        None
    }

    /// Writes a value to every tier
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize cache value");
                return;
            }
        };

        let expires_at = self.clock.now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let entry = CacheEntry::new(data, expires_at);

        self.write_all(key, &entry, ttl, &self.tiers).await;
    }

    /// Writes a value with its namespace's default TTL
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let ttl = self.ttls.for_namespace(key.namespace());
        self.set(key, value, ttl).await;
    }

    /// Removes a key from every tier
    pub async fn invalidate(&self, key: &CacheKey) {
        let results = join_all(self.tiers.iter().map(|tier| async move {
            (tier.kind(), tier.delete(key.as_str()).await)
        }))
        .await;

        for (kind, result) in results {
            if let Err(e) = result {
                self.tier_failed(kind, "delete", &e.to_string());
            }
        }
    }

    /// Purges expired entries from every tier
    pub async fn cleanup(&self) -> CleanupReport {
        let now = self.clock.now();
        let mut report = CleanupReport::default();

        for tier in &self.tiers {
            let cleanup = match tier.purge_expired(now).await {
                Ok(outcome) => TierCleanup {
                    tier: tier.kind(),
                    items_removed: outcome.items_removed,
                    bytes_freed: outcome.bytes_freed,
                    error: None,
                },
                Err(e) => {
                    self.tier_failed(tier.kind(), "cleanup", &e.to_string());
                    TierCleanup {
                        tier: tier.kind(),
                        items_removed: 0,
                        bytes_freed: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.record(cleanup);
        }

        info!(
            items_removed = report.items_removed,
            bytes_freed = report.bytes_freed,
            "Cache cleanup finished"
        );

        report
    }

    pub async fn stats(&self) -> CacheStats {
        let memory_entries = match self.tiers.iter().find(|t| t.kind() == TierKind::Memory) {
            Some(tier) => tier.size().await.unwrap_or(0) as u64,
            None => 0,
        };

        CacheStats::new(
            self.counters.hits(),
            self.counters.misses.load(Ordering::Relaxed),
            self.counters.tier_errors.load(Ordering::Relaxed),
            memory_entries,
        )
    }

    /// Runs `cleanup` every `interval` until `shutdown` flips to true
    pub fn spawn_cleanup_task(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.cleanup().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("Cache cleanup task stopping");
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn promote(&self, key: &CacheKey, entry: &CacheEntry, faster: &[Arc<dyn CacheTier>]) {
        let Some(remaining) = entry.remaining_ttl(self.clock.now()) else {
            return;
        };
        self.write_all(key, entry, remaining, faster).await;
    }

    async fn write_all(
        &self,
        key: &CacheKey,
        entry: &CacheEntry,
        ttl: Duration,
        tiers: &[Arc<dyn CacheTier>],
    ) {
        let results = join_all(tiers.iter().map(|tier| async move {
            (tier.kind(), tier.put_entry(key.as_str(), entry, ttl).await)
        }))
        .await;

        for (kind, result) in results {
            if let Err(e) = result {
                self.tier_failed(kind, "set", &e.to_string());
            }
        }
    }

    fn tier_failed(&self, tier: TierKind, operation: &'static str, error: &str) {
        self.counters.tier_errors.fetch_add(1, Ordering::Relaxed);
        record_cache_tier_error(tier.as_str(), operation);
        warn!(tier = %tier, operation, error, "Cache tier unavailable, continuing without it");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCacheTier;
    use crate::domain::geo::{Coordinates, GeoKey, GeocodeResult};
    use crate::domain::ManualClock;
    use crate::infrastructure::cache::InMemoryTier;
    use chrono::{TimeZone, Utc};

    struct Fixture {
        clock: Arc<ManualClock>,
        memory: Arc<InMemoryTier>,
        shared: Arc<MockCacheTier>,
        durable: Arc<MockCacheTier>,
        cache: MultiTierCache,
    }

    fn fixture_with(shared: MockCacheTier, durable: MockCacheTier) -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let memory = Arc::new(InMemoryTier::new());
        let shared = Arc::new(shared);
        let durable = Arc::new(durable);

        let cache = MultiTierCache::new(
            vec![
                durable.clone() as Arc<dyn CacheTier>,
                memory.clone() as Arc<dyn CacheTier>,
                shared.clone() as Arc<dyn CacheTier>,
            ],
            clock.clone(),
            CacheTtls::default(),
        );

        Fixture {
            clock,
            memory,
            shared,
            durable,
            cache,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            MockCacheTier::new(TierKind::Shared),
            MockCacheTier::new(TierKind::Durable),
        )
    }

    fn geocode_key() -> CacheKey {
        CacheKey::geocode(&GeoKey::from_address("Via Roma 1, 10121 Torino TO"))
    }

    fn turin() -> GeocodeResult {
        let fetched_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        GeocodeResult::new(Coordinates::new(45.0703, 7.6869), fetched_at)
    }

    #[tokio::test]
    async fn test_tiers_sorted_fastest_first() {
        let f = fixture();

        assert_eq!(
            f.cache.tier_kinds(),
            vec![TierKind::Memory, TierKind::Shared, TierKind::Durable]
        );
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let f = fixture();
        let key = geocode_key();

        f.cache.put(&key, &turin()).await;

        assert_eq!(f.cache.get::<GeocodeResult>(&key).await, Some(turin()));
        assert!(f.shared.contains(key.as_str()));
        assert!(f.durable.contains(key.as_str()));
    }

    #[tokio::test]
    async fn test_entry_expires_with_simulated_clock() {
        let f = fixture();
        let key = geocode_key();

        f.cache.set(&key, &turin(), Duration::from_secs(60)).await;
        f.clock.advance(Duration::from_secs(59));
        assert!(f.cache.get::<GeocodeResult>(&key).await.is_some());

        f.clock.advance(Duration::from_secs(1));
        assert!(f.cache.get::<GeocodeResult>(&key).await.is_none());
        assert!(!f.shared.contains(key.as_str()));
    }

    #[tokio::test]
    async fn test_durable_hit_is_promoted() {
        let key = geocode_key();
        let now = Utc::now();
        let entry = CacheEntry::new(
            serde_json::to_string(&turin()).unwrap(),
            now + chrono::Duration::hours(2),
        );
        let f = fixture_with(
            MockCacheTier::new(TierKind::Shared),
            MockCacheTier::new(TierKind::Durable).with_entry(key.as_str(), entry.clone()),
        );

        let value = f.cache.get::<GeocodeResult>(&key).await;

        assert_eq!(value, Some(turin()));
        assert_eq!(f.memory.get_entry(key.as_str()).await.unwrap(), Some(entry.clone()));
        assert_eq!(f.shared.entry(key.as_str()), Some(entry));

        f.cache.get::<GeocodeResult>(&key).await;
        let stats = f.cache.stats().await;
        assert_eq!(stats.hits.durable, 1);
        assert_eq!(stats.hits.memory, 1);
    }

    #[tokio::test]
    async fn test_degraded_tiers_do_not_fail_callers() {
        let f = fixture_with(
            MockCacheTier::new(TierKind::Shared).with_error("connection refused"),
            MockCacheTier::new(TierKind::Durable).with_error("pool timed out"),
        );
        let key = geocode_key();

        f.cache.put(&key, &turin()).await;

        assert_eq!(f.cache.get::<GeocodeResult>(&key).await, Some(turin()));
        let stats = f.cache.stats().await;
        assert_eq!(stats.hits.memory, 1);
        assert_eq!(stats.tier_errors, 2);
    }

    #[tokio::test]
    async fn test_failed_delete_of_undecodable_entry_is_counted() {
        let key = geocode_key();
        let corrupt = CacheEntry::new("not json", Utc::now() + chrono::Duration::hours(2));
        let f = fixture_with(
            MockCacheTier::new(TierKind::Shared),
            MockCacheTier::new(TierKind::Durable)
                .with_entry(key.as_str(), corrupt)
                .with_delete_error("read-only replica"),
        );

        assert!(f.cache.get::<GeocodeResult>(&key).await.is_none());

        let stats = f.cache.stats().await;
        assert_eq!(stats.tier_errors, 1);
        assert_eq!(stats.misses, 1);
        assert!(f.durable.contains(key.as_str()));
    }

    #[tokio::test]
    async fn test_miss_in_all_tiers() {
        let f = fixture();

        assert!(f.cache.get::<GeocodeResult>(&geocode_key()).await.is_none());
        assert_eq!(f.cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_invalidate_removes_everywhere() {
        let f = fixture();
        let key = geocode_key();
        f.cache.put(&key, &turin()).await;

        f.cache.invalidate(&key).await;

        assert!(f.memory.get_entry(key.as_str()).await.unwrap().is_none());
        assert!(!f.shared.contains(key.as_str()));
        assert!(!f.durable.contains(key.as_str()));
    }

    #[tokio::test]
    async fn test_set_is_idempotent() {
        let f = fixture();
        let key = geocode_key();

        f.cache.set(&key, &turin(), Duration::from_secs(60)).await;
        let first = f.durable.entry(key.as_str());
        f.cache.set(&key, &turin(), Duration::from_secs(60)).await;

        assert_eq!(f.durable.entry(key.as_str()), first);
        assert_eq!(f.durable.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_reports_per_tier() {
        let f = fixture_with(
            MockCacheTier::new(TierKind::Shared),
            MockCacheTier::new(TierKind::Durable).with_error("down"),
        );
        let key = geocode_key();
        f.cache.set(&key, &turin(), Duration::from_secs(10)).await;
        f.clock.advance(Duration::from_secs(11));

        let report = f.cache.cleanup().await;

        assert_eq!(report.tiers.len(), 3);
        assert_eq!(report.items_removed, 2);
        assert_eq!(report.errors().len(), 1);
        assert!(!f.shared.contains(key.as_str()));
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let f = fixture();
        let cache = Arc::new(f.cache);
        let (tx, rx) = watch::channel(false);

        let handle = cache.spawn_cleanup_task(Duration::from_secs(3600), rx);
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
