//! Cache-aside geocoding and distance lookups

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    CacheKey, DistanceKey, DistanceResult, GeoKey, GeoLookupClient, GeoLookupError,
    GeocodeResult, TravelMode, Waypoint,
};
use crate::infrastructure::cache::MultiTierCache;

const WARM_CONCURRENCY: usize = 4;

/// Serves lookups from the cache and falls back to the mapping provider.
///
/// Results are cached only on success; failures always reach the caller.
#[derive(Debug)]
pub struct GeoService {
    client: Arc<dyn GeoLookupClient>,
    cache: Arc<MultiTierCache>,
}

impl GeoService {
    pub fn new(client: Arc<dyn GeoLookupClient>, cache: Arc<MultiTierCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<MultiTierCache> {
        &self.cache
    }

    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeoLookupError> {
        let key = CacheKey::geocode(&GeoKey::from_address(address));

        if let Some(cached) = self.cache.get::<GeocodeResult>(&key).await {
            debug!("Geocode served from cache");
            return Ok(cached);
        }

        let result = self.client.geocode(address).await?;
        self.cache.put(&key, &result).await;

        Ok(result)
    }

    #[instrument(skip(self, origin, destination), fields(mode = %mode))]
    pub async fn distance(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
    ) -> Result<DistanceResult, GeoLookupError> {
        let key = CacheKey::distance(&DistanceKey::for_waypoints(origin, destination, mode));

        if let Some(cached) = self.cache.get::<DistanceResult>(&key).await {
            debug!("Distance served from cache");
            return Ok(cached);
        }

        let result = self.client.distance(origin, destination, mode).await?;
        self.cache.put(&key, &result).await;

        Ok(result)
    }

    /// Drops a cached distance so the next lookup reaches the provider
    pub async fn invalidate_distance(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
    ) {
        let key = CacheKey::distance(&DistanceKey::for_waypoints(origin, destination, mode));
        self.cache.invalidate(&key).await;
    }

    /// Geocodes common addresses ahead of demand; returns how many succeeded
    pub async fn warm(&self, addresses: &[String]) -> usize {
        let results: Vec<bool> = stream::iter(addresses.iter().cloned())
            .map(|address| async move {
                match self.geocode(&address).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(address = %address, error = %e, "Failed to warm geocode cache");
                        false
                    }
                }
            })
            .buffer_unordered(WARM_CONCURRENCY)
            .collect()
            .await;

        let warmed = results.into_iter().filter(|ok| *ok).count();
        info!(warmed, total = addresses.len(), "Geocode cache warmed");
        warmed
    }

    pub fn spawn_warm(self: Arc<Self>, addresses: Vec<String>) -> Option<JoinHandle<usize>> {
        if addresses.is_empty() {
            return None;
        }
        Some(tokio::spawn(async move { self.warm(&addresses).await }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::MockGeoLookupClient;
    use crate::domain::{CacheTier, Coordinates, SystemClock};
    use crate::infrastructure::cache::{CacheTtls, InMemoryTier};

    fn service(client: MockGeoLookupClient) -> (GeoService, Arc<MockGeoLookupClient>) {
        let client = Arc::new(client);
        let cache = MultiTierCache::new(
            vec![Arc::new(InMemoryTier::new()) as Arc<dyn CacheTier>],
            Arc::new(SystemClock),
            CacheTtls::default(),
        );
        (GeoService::new(client.clone(), Arc::new(cache)), client)
    }

    #[tokio::test]
    async fn test_geocode_cached_across_spellings() {
        let (service, client) = service(
            MockGeoLookupClient::new().with_geocode("Via Roma 1, Torino", Coordinates::new(45.07, 7.68)),
        );

        service.geocode("Via Roma 1, Torino").await.unwrap();
        let second = service.geocode("  via roma 1,torino, Italia").await.unwrap();

        assert_eq!(second.coordinates(), Coordinates::new(45.07, 7.68));
        assert_eq!(client.geocode_calls(), 1);
    }

    #[tokio::test]
    async fn test_distance_cached() {
        let (service, client) = service(MockGeoLookupClient::new().with_default_distance(12_000));
        let origin = Waypoint::Coordinates(Coordinates::new(45.07, 7.68));
        let destination = Waypoint::Coordinates(Coordinates::new(45.46, 9.19));

        let first = service.distance(&origin, &destination, TravelMode::Driving).await.unwrap();
        let second = service.distance(&origin, &destination, TravelMode::Driving).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.distance_calls(), 1);

        service
            .invalidate_distance(&origin, &destination, TravelMode::Driving)
            .await;
        service.distance(&origin, &destination, TravelMode::Driving).await.unwrap();
        assert_eq!(client.distance_calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let (service, client) = service(
            MockGeoLookupClient::new().with_failure("Nowhere", GeoLookupError::not_found("ZERO_RESULTS")),
        );

        assert!(service.geocode("Nowhere").await.is_err());
        assert!(service.geocode("Nowhere").await.is_err());

        assert_eq!(client.geocode_calls(), 2);
    }

    #[tokio::test]
    async fn test_warm_counts_successes() {
        let (service, client) = service(
            MockGeoLookupClient::new()
                .with_geocode("Milano", Coordinates::new(45.46, 9.19))
                .with_geocode("Roma", Coordinates::new(41.9, 12.5)),
        );
        let addresses = vec![
            "Milano".to_string(),
            "Roma".to_string(),
            "Atlantide".to_string(),
        ];

        assert_eq!(service.warm(&addresses).await, 2);
        service.geocode("Milano").await.unwrap();
        assert_eq!(client.geocode_calls(), 3);
    }
}
