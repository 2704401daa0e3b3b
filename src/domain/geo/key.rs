//! Normalized lookup keys for geocoding and distance results

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::address::{Coordinates, Waypoint, LOCALE_COUNTRY};
use crate::domain::DomainError;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static COMMA_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").unwrap());

/// Deterministically normalized address or coordinate string.
///
/// Two spellings of the same logical address (case, spacing, missing
/// country suffix) produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoKey(String);

impl GeoKey {
    pub fn from_address(address: &str) -> Self {
        let lowered = address.trim().to_lowercase();
        let collapsed = WHITESPACE.replace_all(&lowered, " ");
        let spaced = COMMA_SPACING.replace_all(&collapsed, ", ");
        let trimmed = spaced.trim_matches(|c: char| c == ',' || c.is_whitespace());

        let suffix = LOCALE_COUNTRY.to_lowercase();
        let suffixed = trimmed == suffix || trimmed.ends_with(&format!(", {}", suffix));

        if suffixed {
            Self(trimmed.to_string())
        } else if trimmed.is_empty() {
            Self(suffix)
        } else {
            Self(format!("{}, {}", trimmed, suffix))
        }
    }

    pub fn from_coordinates(coords: &Coordinates) -> Self {
        Self(coords.to_query())
    }

    pub fn from_waypoint(waypoint: &Waypoint) -> Self {
        match waypoint {
            Waypoint::Coordinates(coords) => Self::from_coordinates(coords),
            Waypoint::Address(address) => Self::from_address(address),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Travel mode accepted by the distance matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Transit => "transit",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "driving" => Ok(Self::Driving),
            "walking" => Ok(Self::Walking),
            "bicycling" => Ok(Self::Bicycling),
            "transit" => Ok(Self::Transit),
            other => Err(DomainError::validation(format!(
                "Unknown travel mode: {}. Valid modes: driving, walking, bicycling, transit",
                other
            ))),
        }
    }
}

/// Composite key of a distance lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistanceKey {
    pub origin: GeoKey,
    pub destination: GeoKey,
    pub mode: TravelMode,
}

impl DistanceKey {
    pub fn new(origin: GeoKey, destination: GeoKey, mode: TravelMode) -> Self {
        Self {
            origin,
            destination,
            mode,
        }
    }

    pub fn for_waypoints(origin: &Waypoint, destination: &Waypoint, mode: TravelMode) -> Self {
        Self::new(
            GeoKey::from_waypoint(origin),
            GeoKey::from_waypoint(destination),
            mode,
        )
    }
}

impl fmt::Display for DistanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.origin, self.destination, self.mode)
    }
}
