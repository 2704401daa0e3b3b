//! API key providers

mod cached_provider;
mod env_provider;

pub use cached_provider::CachedApiKeyProvider;
pub use env_provider::EnvApiKeyProvider;
