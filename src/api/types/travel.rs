//! Travel info response

use serde::Serialize;

use crate::domain::TravelInfo;

#[derive(Debug, Clone, Serialize)]
pub struct TravelInfoResponse {
    pub request_id: String,
    pub professional_id: String,
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub distance_text: String,
    pub duration_text: String,
    /// Euros, two decimals
    pub cost: f64,
    pub calculated_at: String,
}

impl From<TravelInfo> for TravelInfoResponse {
    fn from(info: TravelInfo) -> Self {
        Self {
            cost: info.cost.to_euros(),
            calculated_at: info.calculated_at.to_rfc3339(),
            request_id: info.request_id,
            professional_id: info.professional_id,
            distance_meters: info.distance_meters,
            duration_seconds: info.duration_seconds,
            distance_text: info.distance_text,
            duration_text: info.duration_text,
        }
    }
}
