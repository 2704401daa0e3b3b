//! Infrastructure services

mod geo_service;
mod recalculation_service;
mod travel_info_service;

pub use geo_service::GeoService;
pub use recalculation_service::{RecalculationConfig, RecalculationOrchestrator};
pub use travel_info_service::{PricingConfig, TravelInfoService};
