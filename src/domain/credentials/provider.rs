use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Service name under which the mapping provider key is stored
pub const GOOGLE_MAPS_SERVICE: &str = "GOOGLE_MAPS";

/// Source of third-party API keys (environment, secret store, ...)
#[async_trait]
pub trait ApiKeyProvider: Send + Sync + Debug {
    /// Returns the key for `service`, `None` when not configured
    async fn get_api_key(&self, service: &str) -> Result<Option<String>, DomainError>;

    /// Get provider name for logging/debugging
    fn provider_name(&self) -> &'static str;
}
