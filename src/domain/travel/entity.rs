//! Professionals, service requests and their travel information

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::geo::{Address, Coordinates, DistanceResult, StructuredAddress};
use crate::domain::pricing::{Money, PricingProfile};
use crate::domain::DomainError;

/// Stored location columns of one address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressFields {
    pub line: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AddressFields {
    pub fn structured(line: &str, city: &str, province: &str, postal_code: &str) -> Self {
        Self {
            line: Some(line.to_string()),
            city: Some(city.to_string()),
            province: Some(province.to_string()),
            postal_code: Some(postal_code.to_string()),
            ..Default::default()
        }
    }

    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Default::default()
        }
    }

    pub fn has_line(&self) -> bool {
        self.line.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    /// Stored coordinates win over the textual address
    pub fn to_address(&self) -> Address {
        Address::resolve(
            Coordinates::from_parts(self.latitude, self.longitude),
            StructuredAddress::from_parts(
                self.line.as_deref(),
                self.city.as_deref(),
                self.province.as_deref(),
                self.postal_code.as_deref(),
            ),
        )
    }
}

/// Professional as seen by travel computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalRecord {
    pub id: String,
    pub residence: AddressFields,
    pub work: AddressFields,
    pub use_residence_as_work_address: bool,
    /// `None` when the professional never configured travel pricing
    pub pricing: Option<PricingProfile>,
}

impl ProfessionalRecord {
    pub fn new(id: impl Into<String>, residence: AddressFields) -> Self {
        Self {
            id: id.into(),
            residence,
            work: AddressFields::default(),
            use_residence_as_work_address: true,
            pricing: None,
        }
    }

    pub fn with_work_address(mut self, work: AddressFields) -> Self {
        self.work = work;
        self.use_residence_as_work_address = false;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingProfile) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Where trips start from
    pub fn origin(&self) -> Address {
        let work_present = self.work.has_line() || self.work.to_address().is_available();
        if !self.use_residence_as_work_address && work_present {
            self.work.to_address()
        } else {
            self.residence.to_address()
        }
    }

    pub fn pricing_or_standard(&self) -> PricingProfile {
        self.pricing.clone().unwrap_or_else(PricingProfile::standard)
    }
}

/// Lifecycle state of a service request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Requests whose travel cost still matters
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ASSIGNED" => Ok(Self::Assigned),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(DomainError::validation(format!(
                "Unknown request status: {}",
                other
            ))),
        }
    }
}

/// Service request as seen by travel computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestRecord {
    pub id: String,
    pub status: RequestStatus,
    pub professional_id: Option<String>,
    pub location: AddressFields,
}

impl ServiceRequestRecord {
    pub fn new(id: impl Into<String>, status: RequestStatus, location: AddressFields) -> Self {
        Self {
            id: id.into(),
            status,
            professional_id: None,
            location,
        }
    }

    pub fn assigned_to(mut self, professional_id: impl Into<String>) -> Self {
        self.professional_id = Some(professional_id.into());
        self
    }

    pub fn destination(&self) -> Address {
        self.location.to_address()
    }
}

/// Computed travel for one request, overwritten wholesale on recompute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelInfo {
    pub request_id: String,
    pub professional_id: String,
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub distance_text: String,
    pub duration_text: String,
    pub cost: Money,
    pub calculated_at: DateTime<Utc>,
}

impl TravelInfo {
    pub fn from_distance(
        request_id: impl Into<String>,
        professional_id: impl Into<String>,
        distance: &DistanceResult,
        cost: Money,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            professional_id: professional_id.into(),
            distance_meters: distance.distance_meters,
            duration_seconds: distance.duration_seconds,
            distance_text: distance.distance_text.clone(),
            duration_text: distance.duration_text.clone(),
            cost,
            calculated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residence() -> AddressFields {
        AddressFields::structured("Via Roma 1", "Torino", "TO", "10121")
    }

    #[test]
    fn test_origin_defaults_to_residence() {
        let professional = ProfessionalRecord::new("p1", residence());

        assert!(matches!(professional.origin(), Address::Structured(a) if a.city.as_deref() == Some("Torino")));
    }

    #[test]
    fn test_origin_prefers_work_address() {
        let professional = ProfessionalRecord::new("p1", residence())
            .with_work_address(AddressFields::structured("Corso Francia 5", "Rivoli", "TO", "10098"));

        assert!(matches!(professional.origin(), Address::Structured(a) if a.city.as_deref() == Some("Rivoli")));
    }

    #[test]
    fn test_origin_ignores_missing_work_address() {
        let mut professional = ProfessionalRecord::new("p1", residence());
        professional.use_residence_as_work_address = false;

        assert!(matches!(professional.origin(), Address::Structured(a) if a.line == "Via Roma 1"));
    }

    #[test]
    fn test_coordinates_win_over_structured() {
        let mut fields = residence();
        fields.latitude = Some(45.07);
        fields.longitude = Some(7.68);

        assert!(matches!(fields.to_address(), Address::Coordinates(_)));
    }

    #[test]
    fn test_incomplete_address_is_unavailable() {
        let fields = AddressFields {
            line: Some("Via Roma 1".to_string()),
            ..Default::default()
        };

        assert_eq!(fields.to_address(), Address::Unavailable);
    }

    #[test]
    fn test_active_statuses() {
        assert!(RequestStatus::Assigned.is_active());
        assert!(RequestStatus::InProgress.is_active());
        assert!(!RequestStatus::Pending.is_active());
        assert!(!RequestStatus::Completed.is_active());
        assert_eq!("IN_PROGRESS".parse::<RequestStatus>().unwrap(), RequestStatus::InProgress);
    }
}
