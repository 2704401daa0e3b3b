use thiserror::Error;

/// Failures of a mapping-provider lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoLookupError {
    /// Missing or rejected credential; never retried
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Transient network or provider fault
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    /// Address or route cannot be resolved; definitive
    #[error("Not found: {message}")]
    NotFound { message: String },
}

impl GeoLookupError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }

    /// Short label used in metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Upstream { .. } => "upstream",
            Self::NotFound { .. } => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_upstream_is_retryable() {
        assert!(GeoLookupError::upstream("timeout").is_retryable());
        assert!(!GeoLookupError::auth("denied").is_retryable());
        assert!(!GeoLookupError::not_found("ZERO_RESULTS").is_retryable());
    }
}
