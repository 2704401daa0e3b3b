//! Travel information for one (request, professional) pair

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use super::geo_service::GeoService;
use crate::domain::pricing::DEFAULT_FALLBACK_RATE_PER_KM;
use crate::domain::{
    Address, Clock, ProfessionalRecord, ServiceRequestRecord, TravelCostCalculator, TravelError,
    TravelInfo, TravelMode, TravelRepository, Waypoint,
};

/// Pricing settings (`pricing` section)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Per-km rate for misconfigured profiles, in euros
    pub fallback_rate_per_km: f64,
    pub travel_mode: TravelMode,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fallback_rate_per_km: DEFAULT_FALLBACK_RATE_PER_KM,
            travel_mode: TravelMode::Driving,
        }
    }
}

/// Resolves both endpoints, fetches the distance through the cache, prices
/// it and persists the result. Nothing is written when any step fails.
pub struct TravelInfoService {
    repository: Arc<dyn TravelRepository>,
    geo: Arc<GeoService>,
    calculator: TravelCostCalculator,
    clock: Arc<dyn Clock>,
    mode: TravelMode,
}

impl fmt::Debug for TravelInfoService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TravelInfoService")
            .field("geo", &self.geo)
            .field("calculator", &self.calculator)
            .field("mode", &self.mode)
            .finish()
    }
}

impl TravelInfoService {
    pub fn new(
        repository: Arc<dyn TravelRepository>,
        geo: Arc<GeoService>,
        clock: Arc<dyn Clock>,
        config: &PricingConfig,
    ) -> Self {
        Self {
            repository,
            geo,
            calculator: TravelCostCalculator::new(config.fallback_rate_per_km),
            clock,
            mode: config.travel_mode,
        }
    }

    pub fn repository(&self) -> &Arc<dyn TravelRepository> {
        &self.repository
    }

    #[instrument(skip(self))]
    pub async fn compute_and_store(
        &self,
        request_id: &str,
        professional_id: &str,
    ) -> Result<TravelInfo, TravelError> {
        let (request, professional) = self.load(request_id, professional_id).await?;
        self.compute_for(&request, &professional, false).await
    }

    /// Recomputes after dropping the cached distance for the pair
    #[instrument(skip(self))]
    pub async fn refresh(
        &self,
        request_id: &str,
        professional_id: &str,
    ) -> Result<TravelInfo, TravelError> {
        let (request, professional) = self.load(request_id, professional_id).await?;
        self.compute_for(&request, &professional, true).await
    }

    /// Computes and stores travel for records already loaded by the caller
    pub async fn compute_for(
        &self,
        request: &ServiceRequestRecord,
        professional: &ProfessionalRecord,
        refresh: bool,
    ) -> Result<TravelInfo, TravelError> {
        let origin = self
            .waypoint(professional.origin(), || {
                format!("Professional '{}' has no usable address", professional.id)
            })
            .await?;
        let destination = self
            .waypoint(request.destination(), || {
                format!("Request '{}' has no usable address", request.id)
            })
            .await?;

        if refresh {
            self.geo
                .invalidate_distance(&origin, &destination, self.mode)
                .await;
        }

        let distance = self.geo.distance(&origin, &destination, self.mode).await?;
        let cost = self
            .calculator
            .cost(distance.distance_km(), &professional.pricing_or_standard());

        let info = TravelInfo::from_distance(
            &request.id,
            &professional.id,
            &distance,
            cost,
            self.clock.now(),
        );
        self.repository.save_travel_info(&info).await?;

        info!(
            request_id = %request.id,
            professional_id = %professional.id,
            distance_meters = info.distance_meters,
            cost = %info.cost,
            "Travel info stored"
        );

        Ok(info)
    }

    async fn load(
        &self,
        request_id: &str,
        professional_id: &str,
    ) -> Result<(ServiceRequestRecord, ProfessionalRecord), TravelError> {
        let professional = self
            .repository
            .find_professional(professional_id)
            .await?
            .ok_or_else(|| {
                TravelError::not_found(format!("Professional '{}' not found", professional_id))
            })?;

        let request = self
            .repository
            .find_request(request_id)
            .await?
            .ok_or_else(|| TravelError::not_found(format!("Request '{}' not found", request_id)))?;

        Ok((request, professional))
    }

    /// Structured addresses are geocoded (through the cache) first
    async fn waypoint(
        &self,
        address: Address,
        missing: impl FnOnce() -> String,
    ) -> Result<Waypoint, TravelError> {
        match address {
            Address::Coordinates(coords) => Ok(Waypoint::Coordinates(coords)),
            Address::Structured(structured) => {
                let geocoded = self.geo.geocode(&structured.formatted()).await?;
                Ok(Waypoint::Coordinates(geocoded.coordinates()))
            }
            Address::Unavailable => Err(TravelError::missing_address(missing())),
        }
    }
}
