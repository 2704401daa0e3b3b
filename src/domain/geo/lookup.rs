//! Mapping-provider lookup contract

use std::fmt::Debug;

use async_trait::async_trait;

use super::address::Waypoint;
use super::error::GeoLookupError;
use super::key::TravelMode;
use super::result::{DistanceResult, GeocodeResult};

/// Stateless transport to the external mapping provider.
///
/// Implementations own timeout, retry and circuit-breaking for their
/// upstream and never cache responses.
#[async_trait]
pub trait GeoLookupClient: Send + Sync + Debug {
    /// Resolves a free-text address to coordinates
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeoLookupError>;

    /// Travel distance and duration between two points
    async fn distance(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
    ) -> Result<DistanceResult, GeoLookupError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::geo::Coordinates;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    /// Scripted lookup client that counts upstream calls
    #[derive(Debug, Default)]
    pub struct MockGeoLookupClient {
        geocodes: RwLock<HashMap<String, Coordinates>>,
        distances: RwLock<HashMap<String, u64>>,
        failures: RwLock<HashMap<String, GeoLookupError>>,
        default_distance_meters: Option<u64>,
        geocode_calls: AtomicUsize,
        distance_calls: AtomicUsize,
    }

    impl MockGeoLookupClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Distance returned for any pair without an explicit entry
        pub fn with_default_distance(mut self, meters: u64) -> Self {
            self.default_distance_meters = Some(meters);
            self
        }

        pub fn with_geocode(self, address: &str, coords: Coordinates) -> Self {
            self.geocodes
                .write()
                .unwrap()
                .insert(address.to_string(), coords);
            self
        }

        /// Distance for any origin to the given destination query
        pub fn with_distance_to(self, destination: &str, meters: u64) -> Self {
            self.distances
                .write()
                .unwrap()
                .insert(destination.to_string(), meters);
            self
        }

        /// Fails any geocode of `query` or distance lookup towards `query`
        pub fn with_failure(self, query: &str, error: GeoLookupError) -> Self {
            self.failures
                .write()
                .unwrap()
                .insert(query.to_string(), error);
            self
        }

        pub fn geocode_calls(&self) -> usize {
            self.geocode_calls.load(Ordering::SeqCst)
        }

        pub fn distance_calls(&self) -> usize {
            self.distance_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GeoLookupClient for MockGeoLookupClient {
        async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeoLookupError> {
            self.geocode_calls.fetch_add(1, Ordering::SeqCst);

            if let Some(error) = self.failures.read().unwrap().get(address) {
                return Err(error.clone());
            }

            self.geocodes
                .read()
                .unwrap()
                .get(address)
                .map(|coords| GeocodeResult::new(*coords, Utc::now()))
                .ok_or_else(|| GeoLookupError::not_found(format!("No geocode for {}", address)))
        }

        async fn distance(
            &self,
            _origin: &Waypoint,
            destination: &Waypoint,
            _mode: TravelMode,
        ) -> Result<DistanceResult, GeoLookupError> {
            self.distance_calls.fetch_add(1, Ordering::SeqCst);
            let query = destination.to_query();

            if let Some(error) = self.failures.read().unwrap().get(&query) {
                return Err(error.clone());
            }

            let meters = self
                .distances
                .read()
                .unwrap()
                .get(&query)
                .copied()
                .or(self.default_distance_meters)
                .ok_or_else(|| GeoLookupError::not_found(format!("No route to {}", query)))?;

            Ok(DistanceResult::new(meters, meters / 14, None, None, Utc::now()))
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
