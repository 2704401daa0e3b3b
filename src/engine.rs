//! Engine assembly and lifecycle

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{
    ApiKeyProvider, Clock, DomainError, GeoLookupClient, SystemClock, TravelRepository,
};
use crate::infrastructure::cache::{CacheFactory, MultiTierCache};
use crate::infrastructure::credentials::{CachedApiKeyProvider, EnvApiKeyProvider};
use crate::infrastructure::geo::GoogleMapsClient;
use crate::infrastructure::recalculation::InMemoryRecalcRunRepository;
use crate::infrastructure::services::{GeoService, RecalculationOrchestrator, TravelInfoService};
use crate::infrastructure::storage::{connect_pool, run_migrations};
use crate::infrastructure::travel::{InMemoryTravelRepository, PostgresTravelRepository};

const API_KEY_CACHE_TTL: Duration = Duration::from_secs(300);

/// Externally built collaborators the engine wires together
pub struct EngineParts {
    pub client: Arc<dyn GeoLookupClient>,
    pub repository: Arc<dyn TravelRepository>,
    pub cache: Arc<MultiTierCache>,
    pub clock: Arc<dyn Clock>,
    pub pool: Option<PgPool>,
}

/// Owns every long-lived component and background task.
///
/// Built once by [`GeoEngine::init`] and torn down with [`GeoEngine::shutdown`].
pub struct GeoEngine {
    cache: Arc<MultiTierCache>,
    geo: Arc<GeoService>,
    travel: Arc<TravelInfoService>,
    orchestrator: Arc<RecalculationOrchestrator>,
    pool: Option<PgPool>,
    shutdown_tx: watch::Sender<bool>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
    warm_task: Mutex<Option<JoinHandle<usize>>>,
}

impl GeoEngine {
    /// Connects storage, builds the cache tiers and the provider client, then
    /// starts the cleanup and warm-up tasks
    pub async fn init(config: &AppConfig) -> Result<Self, DomainError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let pool = connect_pool(&config.database).await?;
        if let Some(pool) = &pool {
            if config.database.run_migrations {
                run_migrations(pool).await?;
            }
        }

        let cache = Arc::new(
            CacheFactory::new()
                .create(&config.cache, pool.clone(), clock.clone())
                .await,
        );

        let keys: Arc<dyn ApiKeyProvider> = Arc::new(CachedApiKeyProvider::new(
            EnvApiKeyProvider::new(),
            API_KEY_CACHE_TTL,
        ));
        let client = Arc::new(GoogleMapsClient::new(
            config.maps.clone(),
            keys,
            clock.clone(),
        )?);

        let repository: Arc<dyn TravelRepository> = match &pool {
            Some(pool) => Arc::new(PostgresTravelRepository::new(pool.clone())),
            None => {
                warn!("No database configured, travel data is kept in memory");
                Arc::new(InMemoryTravelRepository::new())
            }
        };

        let engine = Self::assemble(
            config,
            EngineParts {
                client,
                repository,
                cache,
                clock,
                pool,
            },
        );
        engine.start_background(config);

        info!("Geo engine initialized");
        Ok(engine)
    }

    /// Wires the services without starting any background task
    pub fn assemble(config: &AppConfig, parts: EngineParts) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let geo = Arc::new(GeoService::new(parts.client, parts.cache.clone()));
        let travel = Arc::new(TravelInfoService::new(
            parts.repository,
            geo.clone(),
            parts.clock.clone(),
            &config.pricing,
        ));
        let orchestrator = Arc::new(RecalculationOrchestrator::new(
            travel.clone(),
            Arc::new(InMemoryRecalcRunRepository::with_capacity(
                config.recalculation.run_retention,
            )),
            parts.clock,
            &config.recalculation,
            shutdown_rx,
        ));

        Self {
            cache: parts.cache,
            geo,
            travel,
            orchestrator,
            pool: parts.pool,
            shutdown_tx,
            cleanup_task: Mutex::new(None),
            warm_task: Mutex::new(None),
        }
    }

    fn start_background(&self, config: &AppConfig) {
        let cleanup = self
            .cache
            .clone()
            .spawn_cleanup_task(config.cache.cleanup_interval(), self.shutdown_tx.subscribe());
        *self.cleanup_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(cleanup);

        let warm = self.geo.clone().spawn_warm(config.cache.warm_addresses.clone());
        *self.warm_task.lock().unwrap_or_else(|e| e.into_inner()) = warm;
    }

    pub fn cache(&self) -> &Arc<MultiTierCache> {
        &self.cache
    }

    pub fn geo(&self) -> &Arc<GeoService> {
        &self.geo
    }

    pub fn travel(&self) -> &Arc<TravelInfoService> {
        &self.travel
    }

    pub fn orchestrator(&self) -> &Arc<RecalculationOrchestrator> {
        &self.orchestrator
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stops dispatching recalculation items, waits for runs in flight and
    /// the cleanup task, then closes the pool. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send_replace(true) {
            return;
        }
        info!("Geo engine shutting down");

        if let Some(warm) = self.warm_task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            warm.abort();
        }

        self.orchestrator.wait_for_runs().await;

        let cleanup = self
            .cleanup_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(cleanup) = cleanup {
            if let Err(e) = cleanup.await {
                warn!(error = %e, "Cache cleanup task ended abnormally");
            }
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }

        info!("Geo engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::MockGeoLookupClient;
    use crate::domain::{AddressFields, ProfessionalRecord, RequestStatus, ServiceRequestRecord};
    use crate::infrastructure::cache::{CacheTtls, InMemoryTier};

    fn in_memory_engine() -> GeoEngine {
        let repository = InMemoryTravelRepository::new()
            .with_professional(ProfessionalRecord::new(
                "p1",
                AddressFields::coordinates(45.07, 7.68),
            ))
            .with_request(
                ServiceRequestRecord::new(
                    "r1",
                    RequestStatus::Assigned,
                    AddressFields::coordinates(45.46, 9.19),
                )
                .assigned_to("p1"),
            );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(MultiTierCache::new(
            vec![Arc::new(InMemoryTier::new()) as Arc<dyn crate::domain::CacheTier>],
            clock.clone(),
            CacheTtls::default(),
        ));

        GeoEngine::assemble(
            &AppConfig::default(),
            EngineParts {
                client: Arc::new(MockGeoLookupClient::new().with_default_distance(140_000)),
                repository: Arc::new(repository),
                cache,
                clock,
                pool: None,
            },
        )
    }

    #[tokio::test]
    async fn test_assembled_engine_computes_travel() {
        let engine = in_memory_engine();

        let info = engine.travel().compute_and_store("r1", "p1").await.unwrap();

        assert_eq!(info.distance_meters, 140_000);
        assert_eq!(engine.cache().stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let engine = in_memory_engine();

        engine.shutdown().await;
        engine.shutdown().await;

        assert!(engine.is_shutting_down());
    }

    #[tokio::test]
    async fn test_runs_after_shutdown_skip_items() {
        let engine = in_memory_engine();
        engine.shutdown().await;

        let report = engine.orchestrator().recalculate_professional("p1").await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.total_attempted, 0);
    }

    #[tokio::test]
    async fn test_init_without_database_runs_in_memory() {
        let engine = GeoEngine::init(&AppConfig::default()).await.unwrap();

        assert!(!engine.is_shutting_down());
        assert_eq!(engine.cache().tier_kinds().len(), 1);

        engine.shutdown().await;
    }
}
