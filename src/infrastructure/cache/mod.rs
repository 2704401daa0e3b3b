//! Cache infrastructure - tier implementations and the multi-tier cache

mod factory;
mod in_memory;
mod multi_tier;
mod postgres;
mod redis;

pub use factory::{CacheConfig, CacheFactory};
pub use in_memory::{InMemoryTier, InMemoryTierConfig};
pub use multi_tier::{CacheTtls, MultiTierCache};
pub use postgres::PostgresTier;
pub use redis::{RedisTier, RedisTierConfig};
