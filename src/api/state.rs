//! Application state for shared services

use std::sync::Arc;

use crate::engine::GeoEngine;
use crate::infrastructure::cache::MultiTierCache;
use crate::infrastructure::services::{RecalculationOrchestrator, TravelInfoService};

/// Handles to the engine services used by the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MultiTierCache>,
    pub travel: Arc<TravelInfoService>,
    pub orchestrator: Arc<RecalculationOrchestrator>,
}

impl AppState {
    pub fn from_engine(engine: &GeoEngine) -> Self {
        Self {
            cache: engine.cache().clone(),
            travel: engine.travel().clone(),
            orchestrator: engine.orchestrator().clone(),
        }
    }
}
