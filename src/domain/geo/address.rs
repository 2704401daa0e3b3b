//! Typed addresses and waypoints

use std::fmt;

use serde::{Deserialize, Serialize};

/// Locale suffix appended to formatted addresses sent to the provider
pub const LOCALE_COUNTRY: &str = "Italia";

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds coordinates only when both components are present and in range
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => {
                let coords = Self::new(lat, lng);
                coords.is_valid().then_some(coords)
            }
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Provider query form, fixed to 6 decimals (~0.1 m)
    pub fn to_query(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query())
    }
}

/// A postal address assembled from its stored components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAddress {
    pub line: String,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
}

impl StructuredAddress {
    /// Builds an address when the stored parts are sufficient for geocoding.
    ///
    /// A line that already contains a comma is treated as a fully formatted
    /// address (e.g. picked from an autocomplete widget) and needs no other
    /// parts; otherwise city, province and postal code are all required.
    pub fn from_parts(
        line: Option<&str>,
        city: Option<&str>,
        province: Option<&str>,
        postal_code: Option<&str>,
    ) -> Option<Self> {
        let line = non_blank(line)?;
        let city = non_blank(city);
        let province = non_blank(province);
        let postal_code = non_blank(postal_code);

        let fully_formatted = line.contains(',');
        let has_components = city.is_some() && province.is_some() && postal_code.is_some();

        if !fully_formatted && !has_components {
            return None;
        }

        Some(Self {
            line,
            city,
            province,
            postal_code,
        })
    }

    /// Single-line form used as the geocoding query
    pub fn formatted(&self) -> String {
        match (&self.city, &self.province, &self.postal_code) {
            (Some(city), Some(province), Some(postal_code)) => format!(
                "{}, {} {} {}, {}",
                self.line, postal_code, city, province, LOCALE_COUNTRY
            ),
            _ => self.line.clone(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolved location of one endpoint of a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Address {
    Coordinates(Coordinates),
    Structured(StructuredAddress),
    Unavailable,
}

impl Address {
    /// Prefers coordinates, which avoid a geocoding round trip
    pub fn resolve(coordinates: Option<Coordinates>, structured: Option<StructuredAddress>) -> Self {
        match (coordinates, structured) {
            (Some(coords), _) => Self::Coordinates(coords),
            (None, Some(address)) => Self::Structured(address),
            (None, None) => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

/// Input accepted by the distance lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Waypoint {
    Coordinates(Coordinates),
    Address(String),
}

impl Waypoint {
    pub fn to_query(&self) -> String {
        match self {
            Self::Coordinates(coords) => coords.to_query(),
            Self::Address(address) => address.clone(),
        }
    }
}

impl From<Coordinates> for Waypoint {
    fn from(coords: Coordinates) -> Self {
        Self::Coordinates(coords)
    }
}
