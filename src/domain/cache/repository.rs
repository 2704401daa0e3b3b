//! Cache tier trait definition

use std::fmt::{self, Debug};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Position of a store in the lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    /// In-process memory
    Memory,
    /// Shared key-value store
    Shared,
    /// Durable fallback table
    Durable,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Shared => "shared",
            Self::Durable => "durable",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized value with its absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Serialized JSON value
    pub data: String,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(data: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            data: data.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Result of purging expired entries from one tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    pub items_removed: u64,
    pub bytes_freed: u64,
}

/// One storage tier of the lookup cache.
///
/// Tiers store opaque entries; expiry is decided by the caller against its
/// own clock so every tier ages entries identically.
#[async_trait]
pub trait CacheTier: Send + Sync + Debug {
    /// Which tier this store implements
    fn kind(&self) -> TierKind;

    /// Gets an entry, expired or not
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, DomainError>;

    /// Stores an entry, replacing any previous value. `ttl` is the time
    /// left before `entry.expires_at` on the caller's clock.
    async fn put_entry(
        &self,
        key: &str,
        entry: &CacheEntry,
        ttl: Duration,
    ) -> Result<(), DomainError>;

    /// Deletes a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Removes entries whose expiry is at or before `now`
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeOutcome, DomainError>;

    /// Returns approximate number of entries
    async fn size(&self) -> Result<usize, DomainError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expiry() {
        let now = Utc::now();
        let entry = CacheEntry::new("x", now + chrono::Duration::seconds(10));

        assert!(!entry.is_expired(now));
        assert!(entry.is_expired(now + chrono::Duration::seconds(10)));
        assert_eq!(entry.remaining_ttl(now), Some(Duration::from_secs(10)));
        assert_eq!(entry.remaining_ttl(now + chrono::Duration::seconds(11)), None);
    }
}
