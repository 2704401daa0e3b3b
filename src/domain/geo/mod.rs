//! Geo domain - addresses, lookup keys and the mapping-provider contract

mod address;
mod error;
mod key;
mod lookup;
mod result;

pub use address::{Address, Coordinates, StructuredAddress, Waypoint, LOCALE_COUNTRY};
pub use error::GeoLookupError;
pub use key::{DistanceKey, GeoKey, TravelMode};
pub use lookup::GeoLookupClient;
pub use result::{format_distance, format_duration, DistanceResult, GeocodeResult};

#[cfg(test)]
pub use lookup::mock::MockGeoLookupClient;
