//! Results returned by the mapping provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::Coordinates;

/// Outcome of geocoding one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub fetched_at: DateTime<Utc>,
}

impl GeocodeResult {
    pub fn new(coordinates: Coordinates, fetched_at: DateTime<Utc>) -> Self {
        Self {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            fetched_at,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Outcome of one origin/destination distance lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub distance_text: String,
    pub duration_text: String,
    pub fetched_at: DateTime<Utc>,
}

impl DistanceResult {
    /// Builds a result, deriving display texts when the provider omitted them
    pub fn new(
        distance_meters: u64,
        duration_seconds: u64,
        distance_text: Option<String>,
        duration_text: Option<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            distance_meters,
            duration_seconds,
            distance_text: distance_text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format_distance(distance_meters)),
            duration_text: duration_text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format_duration(duration_seconds)),
            fetched_at,
        }
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_meters as f64 / 1000.0
    }
}

/// Formats meters as kilometers with one decimal, e.g. `12.5 km`
pub fn format_distance(distance_meters: u64) -> String {
    format!("{:.1} km", distance_meters as f64 / 1000.0)
}

/// Formats seconds in the product's locale, e.g. `45 min` or `1 ore 5 min`
pub fn format_duration(duration_seconds: u64) -> String {
    let minutes = (duration_seconds + 30) / 60;

    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{} ore {} min", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(12_480), "12.5 km");
        assert_eq!(format_distance(0), "0.0 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45 * 60), "45 min");
        assert_eq!(format_duration(65 * 60), "1 ore 5 min");
        assert_eq!(format_duration(89), "1 min");
    }

    #[test]
    fn test_provider_texts_preferred() {
        let result = DistanceResult::new(
            12_480,
            900,
            Some("12,5 km".to_string()),
            Some("".to_string()),
            Utc::now(),
        );

        assert_eq!(result.distance_text, "12,5 km");
        assert_eq!(result.duration_text, "15 min");
        assert!((result.distance_km() - 12.48).abs() < 1e-9);
    }
}
