//! Mapping provider adapters

mod circuit_breaker;
mod google_maps;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use google_maps::{GoogleMapsClient, GoogleMapsConfig};
