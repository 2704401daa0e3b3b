//! Travel domain - endpoints of a trip and its persisted outcome

mod entity;
mod error;
mod repository;

pub use entity::{
    AddressFields, ProfessionalRecord, RequestStatus, ServiceRequestRecord, TravelInfo,
};
pub use error::TravelError;
pub use repository::TravelRepository;

#[cfg(test)]
pub use repository::MockTravelRepository;
