//! Cache key generation

use std::fmt;

use sha2::{Digest, Sha256};

use crate::domain::geo::{DistanceKey, GeoKey};

/// Root prefix shared by every mapping cache key
pub const KEY_ROOT: &str = "gm";

/// Kind of value stored under a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    Geocode,
    Distance,
}

impl CacheNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geocode => "geocode",
            Self::Distance => "distance",
        }
    }

    /// Pattern prefix matching every key of this namespace
    pub fn prefix(&self) -> String {
        format!("{}:{}:", KEY_ROOT, self.as_str())
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hashed, namespaced cache key: `gm:<namespace>:<sha256 hex>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: CacheNamespace,
    value: String,
}

impl CacheKey {
    /// Hashes an already-normalized input into a key
    pub fn new(namespace: CacheNamespace, input: &str) -> Self {
        let digest = Sha256::digest(input.as_bytes());
        Self {
            namespace,
            value: format!("{}{}", namespace.prefix(), hex::encode(digest)),
        }
    }

    pub fn geocode(key: &GeoKey) -> Self {
        Self::new(CacheNamespace::Geocode, key.as_str())
    }

    pub fn distance(key: &DistanceKey) -> Self {
        Self::new(CacheNamespace::Distance, &key.to_string())
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::TravelMode;

    #[test]
    fn test_key_format() {
        let key = CacheKey::geocode(&GeoKey::from_address("Roma"));

        assert!(key.as_str().starts_with("gm:geocode:"));
        assert_eq!(key.as_str().len(), "gm:geocode:".len() + 64);
        assert_eq!(key.namespace(), CacheNamespace::Geocode);
    }

    #[test]
    fn test_equivalent_addresses_share_key() {
        let a = CacheKey::geocode(&GeoKey::from_address("ROMA,  Italia"));
        let b = CacheKey::geocode(&GeoKey::from_address("roma"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_distance_key_depends_on_mode() {
        let origin = GeoKey::from_address("Roma");
        let destination = GeoKey::from_address("Milano");

        let driving = CacheKey::distance(&DistanceKey::new(
            origin.clone(),
            destination.clone(),
            TravelMode::Driving,
        ));
        let transit = CacheKey::distance(&DistanceKey::new(origin, destination, TravelMode::Transit));

        assert_ne!(driving, transit);
        assert!(driving.as_str().starts_with("gm:distance:"));
    }
}
