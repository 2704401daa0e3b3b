use thiserror::Error;

use crate::domain::geo::GeoLookupError;
use crate::domain::DomainError;

/// Failures of a travel computation
#[derive(Debug, Error)]
pub enum TravelError {
    /// An endpoint has neither coordinates nor a usable address
    #[error("Missing address: {message}")]
    MissingAddress { message: String },

    #[error("Lookup failed: {0}")]
    LookupFailed(#[from] GeoLookupError),

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] DomainError),
}

impl TravelError {
    pub fn missing_address(message: impl Into<String>) -> Self {
        Self::MissingAddress {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Short label used in metrics and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingAddress { .. } => "missing_address",
            Self::LookupFailed(_) => "lookup_failed",
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_conversion() {
        let error: TravelError = GeoLookupError::not_found("ZERO_RESULTS").into();

        assert_eq!(error.kind(), "lookup_failed");
        assert_eq!(error.to_string(), "Lookup failed: Not found: ZERO_RESULTS");
    }
}
