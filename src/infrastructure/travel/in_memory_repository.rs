//! In-memory travel repository for development and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{
    DomainError, ProfessionalRecord, ServiceRequestRecord, TravelInfo, TravelRepository,
};

/// In-memory implementation of TravelRepository
#[derive(Debug, Default)]
pub struct InMemoryTravelRepository {
    professionals: RwLock<HashMap<String, ProfessionalRecord>>,
    requests: RwLock<HashMap<String, ServiceRequestRecord>>,
    travel: RwLock<HashMap<String, TravelInfo>>,
    saves: AtomicUsize,
}

impl InMemoryTravelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_professional(self, professional: ProfessionalRecord) -> Self {
        if let Ok(mut professionals) = self.professionals.write() {
            professionals.insert(professional.id.clone(), professional);
        }
        self
    }

    pub fn with_request(self, request: ServiceRequestRecord) -> Self {
        if let Ok(mut requests) = self.requests.write() {
            requests.insert(request.id.clone(), request);
        }
        self
    }

    pub fn with_travel_info(self, info: TravelInfo) -> Self {
        if let Ok(mut travel) = self.travel.write() {
            travel.insert(info.request_id.clone(), info);
        }
        self
    }

    /// Replaces a professional, e.g. after an address change
    pub fn upsert_professional(&self, professional: ProfessionalRecord) -> Result<(), DomainError> {
        let mut professionals = self
            .professionals
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;
        professionals.insert(professional.id.clone(), professional);
        Ok(())
    }

    pub fn upsert_request(&self, request: ServiceRequestRecord) -> Result<(), DomainError> {
        let mut requests = self
            .requests
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;
        requests.insert(request.id.clone(), request);
        Ok(())
    }

    /// Number of successful `save_travel_info` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TravelRepository for InMemoryTravelRepository {
    async fn find_professional(&self, id: &str) -> Result<Option<ProfessionalRecord>, DomainError> {
        let professionals = self
            .professionals
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(professionals.get(id).cloned())
    }

    async fn find_request(&self, id: &str) -> Result<Option<ServiceRequestRecord>, DomainError> {
        let requests = self
            .requests
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(requests.get(id).cloned())
    }

    async fn list_active_requests(
        &self,
        professional_id: &str,
    ) -> Result<Vec<ServiceRequestRecord>, DomainError> {
        let requests = self
            .requests
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let mut result: Vec<_> = requests
            .values()
            .filter(|r| {
                r.status.is_active() && r.professional_id.as_deref() == Some(professional_id)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(result)
    }

    async fn save_travel_info(&self, info: &TravelInfo) -> Result<(), DomainError> {
        let exists = self
            .requests
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?
            .contains_key(&info.request_id);

        if !exists {
            return Err(DomainError::not_found(format!(
                "Request '{}' not found",
                info.request_id
            )));
        }

        let mut travel = self
            .travel
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;
        travel.insert(info.request_id.clone(), info.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_travel_info(&self, request_id: &str) -> Result<Option<TravelInfo>, DomainError> {
        let travel = self
            .travel
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(travel.get(request_id).cloned())
    }
}
