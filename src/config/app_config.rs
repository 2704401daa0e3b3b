use serde::Deserialize;

use crate::infrastructure::cache::CacheConfig;
use crate::infrastructure::geo::GoogleMapsConfig;
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::services::{PricingConfig, RecalculationConfig};
use crate::infrastructure::storage::DatabaseConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub maps: GoogleMapsConfig,
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
    pub recalculation: RecalculationConfig,
    pub pricing: PricingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Layers `config/default`, `config/local` and `APP__*` environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cache.warm_addresses")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn from_json(json: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.recalculation.concurrency(), 5);
        assert!(config.metrics.enabled);
        assert!(!config.database.is_configured());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = from_json(
            r#"{
                "server": {"port": 9090},
                "logging": {"format": "json"},
                "cache": {"distance_ttl_secs": 600},
                "recalculation": {"concurrency": 50}
            }"#,
        );

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cache.distance_ttl_secs, 600);
        assert_eq!(config.recalculation.concurrency(), 10);
    }

    #[test]
    fn test_empty_source_is_default() {
        let config = from_json("{}");

        assert_eq!(config.maps.region, "it");
        assert_eq!(config.pricing.fallback_rate_per_km, 0.50);
    }
}
