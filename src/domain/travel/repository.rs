//! Persistence boundary for travel computation

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{ProfessionalRecord, ServiceRequestRecord, TravelInfo};
use crate::domain::DomainError;

/// Loads professionals and requests, stores computed travel info
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TravelRepository: Send + Sync {
    async fn find_professional(&self, id: &str) -> Result<Option<ProfessionalRecord>, DomainError>;

    async fn find_request(&self, id: &str) -> Result<Option<ServiceRequestRecord>, DomainError>;

    /// Requests assigned to the professional in an active status
    async fn list_active_requests(
        &self,
        professional_id: &str,
    ) -> Result<Vec<ServiceRequestRecord>, DomainError>;

    /// Replaces the travel info of a request
    async fn save_travel_info(&self, info: &TravelInfo) -> Result<(), DomainError>;

    async fn find_travel_info(&self, request_id: &str) -> Result<Option<TravelInfo>, DomainError>;
}
