//! Cache domain - tiered lookup cache abstraction

mod key;
mod repository;
mod stats;

pub use key::{CacheKey, CacheNamespace, KEY_ROOT};
pub use repository::{CacheEntry, CacheTier, PurgeOutcome, TierKind};
pub use stats::{CacheStats, CleanupReport, TierBreakdown, TierCleanup, UPSTREAM_CALL_COST_EUR};

#[cfg(test)]
pub use repository::mock::MockCacheTier;
