//! Cache factory assembling the configured tiers

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::domain::cache::CacheTier;
use crate::domain::Clock;

use super::in_memory::{InMemoryTier, InMemoryTierConfig};
use super::multi_tier::{CacheTtls, MultiTierCache};
use super::postgres::PostgresTier;
use super::redis::{RedisTier, RedisTierConfig};

/// Largest Italian cities, geocoded at start-up unless configured otherwise
pub const DEFAULT_WARM_ADDRESSES: [&str; 10] = [
    "Roma, Italia",
    "Milano, Italia",
    "Napoli, Italia",
    "Torino, Italia",
    "Palermo, Italia",
    "Genova, Italia",
    "Bologna, Italia",
    "Firenze, Italia",
    "Bari, Italia",
    "Catania, Italia",
];

/// Cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries held in process
    pub memory_max_capacity: u64,
    pub geocode_ttl_secs: u64,
    pub distance_ttl_secs: u64,
    /// Shared tier; disabled when absent
    pub redis_url: Option<String>,
    pub redis_key_prefix: Option<String>,
    /// Durable tier; needs a database pool
    pub durable_enabled: bool,
    /// Period of the background purge of expired entries
    pub cleanup_interval_secs: u64,
    /// Addresses geocoded in the background at start-up; empty disables warming
    pub warm_addresses: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_max_capacity: 10_000,
            geocode_ttl_secs: 7 * 24 * 3600,
            distance_ttl_secs: 3600,
            redis_url: None,
            redis_key_prefix: None,
            durable_enabled: true,
            cleanup_interval_secs: 3600,
            warm_addresses: DEFAULT_WARM_ADDRESSES.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl CacheConfig {
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            geocode: Duration::from_secs(self.geocode_ttl_secs.max(1)),
            distance: Duration::from_secs(self.distance_ttl_secs.max(1)),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    pub fn with_redis(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }
}

/// Factory for the multi-tier cache
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Builds the cache from whichever tiers are configured and reachable.
    ///
    /// A shared tier that is unreachable at start-up is kept and reconnects
    /// on demand; one with an invalid URL is left out with a warning.
    pub async fn create(
        &self,
        config: &CacheConfig,
        pool: Option<PgPool>,
        clock: Arc<dyn Clock>,
    ) -> MultiTierCache {
        let ttls = config.ttls();
        let mut tiers: Vec<Arc<dyn CacheTier>> = vec![Arc::new(InMemoryTier::with_config(
            InMemoryTierConfig::default()
                .with_max_capacity(config.memory_max_capacity)
                .with_max_ttl(ttls.geocode.max(ttls.distance)),
        ))];

        if let Some(url) = &config.redis_url {
            let mut redis_config = RedisTierConfig::new(url.clone());
            if let Some(prefix) = &config.redis_key_prefix {
                redis_config = redis_config.with_key_prefix(prefix.clone());
            }

            match RedisTier::connect(redis_config.clone()).await {
                Ok(tier) => {
                    info!("Shared cache tier connected");
                    tiers.push(Arc::new(tier));
                }
                Err(e) => match RedisTier::lazy(redis_config) {
                    Ok(tier) => {
                        warn!(error = %e, "Shared cache tier unreachable, will reconnect on demand");
                        tiers.push(Arc::new(tier));
                    }
                    Err(e) => warn!(error = %e, "Shared cache tier misconfigured, starting without it"),
                },
            }
        }

        match (config.durable_enabled, pool) {
            (true, Some(pool)) => tiers.push(Arc::new(PostgresTier::new(pool))),
            (true, None) => warn!("Durable cache tier enabled but no database configured"),
            (false, _) => {}
        }

        let cache = MultiTierCache::new(tiers, clock, ttls);
        info!(tiers = ?cache.tier_kinds(), "Geo cache initialized");
        cache
    }
}
