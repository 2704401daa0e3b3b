//! API key management domain

mod provider;

pub use provider::{ApiKeyProvider, GOOGLE_MAPS_SERVICE};

#[cfg(test)]
pub use provider::mock;
