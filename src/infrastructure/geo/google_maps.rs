//! Google Maps Geocoding and Distance Matrix client

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::domain::{
    ApiKeyProvider, Clock, Coordinates, DistanceResult, DomainError, GeoLookupClient,
    GeoLookupError, GeocodeResult, TravelMode, Waypoint, GOOGLE_MAPS_SERVICE,
};
use crate::infrastructure::observability::record_upstream_request;

const DEFAULT_GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com";
const GEOCODE_PATH: &str = "/maps/api/geocode/json";
const DISTANCE_MATRIX_PATH: &str = "/maps/api/distancematrix/json";

/// Mapping provider settings (`maps` section)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleMapsConfig {
    pub base_url: String,
    /// Target of the single retry; the primary URL is reused when unset
    pub secondary_base_url: Option<String>,
    pub timeout_secs: u64,
    pub region: String,
    pub language: String,
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown_secs: u64,
}

impl Default for GoogleMapsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GOOGLE_MAPS_BASE_URL.to_string(),
            secondary_base_url: None,
            timeout_secs: 10,
            region: "it".to_string(),
            language: "it".to_string(),
            circuit_failure_threshold: 5,
            circuit_cooldown_secs: 30,
        }
    }
}

impl GoogleMapsConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_secondary_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.secondary_base_url = Some(base_url.into());
        self
    }

    pub fn with_circuit_threshold(mut self, threshold: u32) -> Self {
        self.circuit_failure_threshold = threshold;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    fn circuit(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_failure_threshold.max(1),
            cooldown: Duration::from_secs(self.circuit_cooldown_secs),
        }
    }
}

/// Google Maps client.
///
/// Each call fetches the API key, passes the circuit breaker and makes at
/// most two attempts, the second only after an upstream fault.
#[derive(Debug)]
pub struct GoogleMapsClient {
    http: reqwest::Client,
    config: GoogleMapsConfig,
    keys: Arc<dyn ApiKeyProvider>,
    clock: Arc<dyn Clock>,
    breaker: CircuitBreaker,
}

impl GoogleMapsClient {
    pub fn new(
        config: GoogleMapsConfig,
        keys: Arc<dyn ApiKeyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            breaker: CircuitBreaker::new(config.circuit(), clock.clone()),
            config: GoogleMapsConfig {
                base_url: trim_base(&config.base_url),
                secondary_base_url: config.secondary_base_url.as_deref().map(trim_base),
                ..config
            },
            keys,
            clock,
        })
    }

    pub fn circuit_state(&self) -> super::CircuitState {
        self.breaker.state()
    }

    async fn api_key(&self) -> Result<String, GeoLookupError> {
        match self.keys.get_api_key(GOOGLE_MAPS_SERVICE).await {
            Ok(Some(key)) => Ok(key),
            Ok(None) => Err(GeoLookupError::auth(format!(
                "No API key configured for {}",
                GOOGLE_MAPS_SERVICE
            ))),
            Err(e) => Err(GeoLookupError::auth(format!("Failed to load API key: {}", e))),
        }
    }

    /// Runs one logical request: breaker, first attempt, optional retry
    async fn call(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, GeoLookupError> {
        let start = Instant::now();
        let key = match self.api_key().await {
            Ok(key) => key,
            Err(e) => {
                record_upstream_request(operation, e.kind(), start.elapsed());
                return Err(e);
            }
        };

        if !self.breaker.try_acquire() {
            record_upstream_request(operation, "circuit_open", start.elapsed());
            return Err(GeoLookupError::upstream("Circuit open for mapping provider"));
        }

        let mut result = self.attempt(&self.config.base_url, path, params, &key).await;

        let retry_reason = match &result {
            Err(e) if e.is_retryable() => Some(e.to_string()),
            _ => None,
        };

        if let Some(reason) = retry_reason {
            let retry_base = self
                .config
                .secondary_base_url
                .as_deref()
                .unwrap_or(&self.config.base_url);
            warn!(operation, error = %reason, retry_base, "Mapping provider failed, retrying once");
            result = self.attempt(retry_base, path, params, &key).await;
        }

        match &result {
            Ok(_) => {
                self.breaker.record_success();
                record_upstream_request(operation, "ok", start.elapsed());
            }
            Err(e) => {
                if e.is_retryable() {
                    self.breaker.record_failure();
                } else {
                    self.breaker.record_neutral();
                }
                record_upstream_request(operation, e.kind(), start.elapsed());
            }
        }

        result
    }

    async fn attempt(
        &self,
        base_url: &str,
        path: &str,
        params: &[(&str, String)],
        key: &str,
    ) -> Result<serde_json::Value, GeoLookupError> {
        let url = format!("{}{}", base_url, path);
        debug!(url = %url, "Calling mapping provider");

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[
                ("region", self.config.region.as_str()),
                ("language", self.config.language.as_str()),
                ("key", key),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeoLookupError::upstream("Request to mapping provider timed out")
                } else {
                    GeoLookupError::upstream(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http(status.as_u16(), &body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GeoLookupError::upstream(format!("Failed to parse response: {}", e)))?;

        let envelope: StatusEnvelope = serde_json::from_value(json.clone())
            .map_err(|e| GeoLookupError::upstream(format!("Malformed response: {}", e)))?;

        match classify_status(&envelope.status, envelope.error_message.as_deref()) {
            Some(error) => Err(error),
            None => Ok(json),
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn classify_http(status: u16, body: &str) -> GeoLookupError {
    let detail = format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>());
    match status {
        401 | 403 => GeoLookupError::auth(detail),
        408 | 429 | 500..=599 => GeoLookupError::upstream(detail),
        _ => GeoLookupError::not_found(detail),
    }
}

/// Maps a provider `status` field; `None` means success
fn classify_status(status: &str, message: Option<&str>) -> Option<GeoLookupError> {
    let detail = match message {
        Some(m) => format!("{}: {}", status, m),
        None => status.to_string(),
    };

    match status {
        "OK" => None,
        "REQUEST_DENIED" => Some(GeoLookupError::auth(detail)),
        "ZERO_RESULTS" | "NOT_FOUND" | "INVALID_REQUEST" | "MAX_ROUTE_LENGTH_EXCEEDED" => {
            Some(GeoLookupError::not_found(detail))
        }
        _ => Some(GeoLookupError::upstream(detail)),
    }
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<TextValue>,
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: u64,
    text: Option<String>,
}

#[async_trait]
impl GeoLookupClient for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeoLookupError> {
        let json = self
            .call("geocode", GEOCODE_PATH, &[("address", address.to_string())])
            .await?;

        let response: GeocodeResponse = serde_json::from_value(json)
            .map_err(|e| GeoLookupError::upstream(format!("Malformed geocode response: {}", e)))?;

        let location = response
            .results
            .into_iter()
            .next()
            .map(|candidate| candidate.geometry.location)
            .ok_or_else(|| GeoLookupError::not_found(format!("No results for '{}'", address)))?;

        let coordinates = Coordinates::new(location.lat, location.lng);
        if !coordinates.is_valid() {
            return Err(GeoLookupError::upstream("Provider returned invalid coordinates"));
        }

        Ok(GeocodeResult::new(coordinates, self.clock.now()))
    }

    async fn distance(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
    ) -> Result<DistanceResult, GeoLookupError> {
        let params = [
            ("origins", origin.to_query()),
            ("destinations", destination.to_query()),
            ("mode", mode.as_str().to_string()),
            ("units", "metric".to_string()),
        ];
        let json = self.call("distance", DISTANCE_MATRIX_PATH, &params).await?;

        let response: DistanceMatrixResponse = serde_json::from_value(json)
            .map_err(|e| GeoLookupError::upstream(format!("Malformed distance response: {}", e)))?;

        let element = response
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| GeoLookupError::upstream("Distance matrix returned no elements"))?;

        if let Some(error) = classify_status(&element.status, None) {
            return Err(error);
        }

        let (Some(distance), Some(duration)) = (element.distance, element.duration) else {
            return Err(GeoLookupError::upstream("Distance matrix element is incomplete"));
        };

        Ok(DistanceResult::new(
            distance.value,
            duration.value,
            distance.text,
            duration.text,
            self.clock.now(),
        ))
    }

    fn provider_name(&self) -> &'static str {
        "google_maps"
    }
}
