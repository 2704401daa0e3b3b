use async_trait::async_trait;
use std::collections::HashMap;
use std::env;

use crate::domain::{ApiKeyProvider, DomainError};

/// API key provider that reads `<SERVICE>_API_KEY` environment variables
#[derive(Debug, Default)]
pub struct EnvApiKeyProvider {
    overrides: HashMap<String, String>,
}

impl EnvApiKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `service` from `env_var` instead of the default name
    pub fn with_mapping(mut self, service: impl Into<String>, env_var: impl Into<String>) -> Self {
        self.overrides.insert(service.into(), env_var.into());
        self
    }

    fn var_name(&self, service: &str) -> String {
        self.overrides
            .get(service)
            .cloned()
            .unwrap_or_else(|| format!("{}_API_KEY", service.to_ascii_uppercase()))
    }
}

#[async_trait]
impl ApiKeyProvider for EnvApiKeyProvider {
    async fn get_api_key(&self, service: &str) -> Result<Option<String>, DomainError> {
        let var = self.var_name(service);

        match env::var(&var) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            Ok(_) | Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(DomainError::credential(format!(
                "Environment variable '{}' is not valid unicode",
                var
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "env"
    }
}
