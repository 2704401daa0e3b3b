//! Tier 2: shared Redis cache

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::cache::{CacheEntry, CacheTier, KEY_ROOT, PurgeOutcome, TierKind};
use crate::domain::DomainError;

/// Configuration for the Redis tier
#[derive(Debug, Clone)]
pub struct RedisTierConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Extra namespace in front of the `gm:` keys, for shared instances
    pub key_prefix: Option<String>,
    pub connection_timeout: Duration,
    /// Upper bound on a single command round trip
    pub operation_timeout: Duration,
    /// Minimum gap between connection attempts while Redis is down
    pub reconnect_interval: Duration,
}

impl Default for RedisTierConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(2),
            reconnect_interval: Duration::from_secs(30),
        }
    }
}

impl RedisTierConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}

/// Shared tier backed by Redis.
///
/// Values are stored as JSON envelopes carrying `expires_at`; the native TTL
/// is set as well so Redis reclaims entries nobody reads again. While Redis
/// is unreachable every call fails fast, and a new connection is attempted
/// at most once per `reconnect_interval`.
#[derive(Clone)]
pub struct RedisTier {
    client: Client,
    connection: Arc<RwLock<Option<ConnectionManager>>>,
    last_attempt: Arc<Mutex<Option<Instant>>>,
    config: RedisTierConfig,
}

impl fmt::Debug for RedisTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTier")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisTier {
    /// Builds the tier without connecting; the first command connects
    pub fn lazy(config: RedisTierConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            last_attempt: Arc::new(Mutex::new(None)),
            config,
        })
    }

    /// Connects to Redis, failing after the configured timeout
    pub async fn connect(config: RedisTierConfig) -> Result<Self, DomainError> {
        let tier = Self::lazy(config)?;
        tier.connection().await?;
        Ok(tier)
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .try_read()
            .map(|conn| conn.is_some())
            .unwrap_or(false)
    }

    async fn connection(&self) -> Result<ConnectionManager, DomainError> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        {
            let mut last_attempt = self.last_attempt.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(at) = *last_attempt {
                if at.elapsed() < self.config.reconnect_interval {
                    return Err(DomainError::cache("Redis unavailable, waiting to reconnect"));
                }
            }
            *last_attempt = Some(Instant::now());
        }

        let conn = tokio::time::timeout(
            self.config.connection_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await
        .map_err(|_| DomainError::cache("Timed out connecting to Redis"))?
        .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        info!("Redis connection established");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn bounded<T>(
        &self,
        what: &str,
        command: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, DomainError> {
        bounded(self.config.operation_timeout, what, command).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn decode(key: &str, raw: &str) -> Result<CacheEntry, DomainError> {
        serde_json::from_str(raw).map_err(|e| {
            DomainError::cache(format!("Corrupt cache envelope for '{}': {}", key, e))
        })
    }
}

/// Runs a Redis command, failing once `timeout` elapses
async fn bounded<T>(
    timeout: Duration,
    what: &str,
    command: impl Future<Output = RedisResult<T>>,
) -> Result<T, DomainError> {
    tokio::time::timeout(timeout, command)
        .await
        .map_err(|_| DomainError::cache(format!("Timed out waiting to {}", what)))?
        .map_err(|e| DomainError::cache(format!("Failed to {}: {}", what, e)))
}

#[async_trait]
impl CacheTier for RedisTier {
    fn kind(&self) -> TierKind {
        TierKind::Shared
    }

    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, DomainError> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = self
            .bounded(&format!("get key '{}'", key), conn.get(self.prefix_key(key)))
            .await?;

        raw.map(|r| Self::decode(key, &r)).transpose()
    }

    async fn put_entry(
        &self,
        key: &str,
        entry: &CacheEntry,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;

        let envelope = serde_json::to_string(entry)
            .map_err(|e| DomainError::cache(format!("Failed to encode entry: {}", e)))?;
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = self
            .bounded(
                &format!("set key '{}'", key),
                conn.set_ex(self.prefix_key(key), envelope, ttl_secs),
            )
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection().await?;

        let deleted: i32 = self
            .bounded(&format!("delete key '{}'", key), conn.del(self.prefix_key(key)))
            .await?;

        Ok(deleted > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeOutcome, DomainError> {
        let mut conn = self.connection().await?;
        let pattern = self.prefix_key(&format!("{}:*", KEY_ROOT));

        let mut cursor = 0u64;
        let mut outcome = PurgeOutcome::default();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = self
                .bounded(
                    "scan keys",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(100)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                let values: Vec<Option<String>> =
                    self.bounded("read keys", conn.mget(&keys)).await?;

                let mut expired = Vec::new();
                for (key, raw) in keys.iter().zip(values) {
                    let Some(raw) = raw else { continue };
                    // Unreadable envelopes are dropped as well
                    let stale = Self::decode(key, &raw)
                        .map(|entry| entry.is_expired(now))
                        .unwrap_or(true);
                    if stale {
                        outcome.bytes_freed += raw.len() as u64;
                        expired.push(key.clone());
                    }
                }

                if !expired.is_empty() {
                    let deleted: u64 = self.bounded("delete keys", conn.del(&expired)).await?;
                    outcome.items_removed += deleted;
                }
            }

            cursor = new_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(outcome)
    }

    async fn size(&self) -> Result<usize, DomainError> {
        let mut conn = self.connection().await?;
        let pattern = self.prefix_key(&format!("{}:*", KEY_ROOT));
        let mut cursor = 0u64;
        let mut count = 0usize;

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = self
                .bounded(
                    "scan keys",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(1000)
                        .query_async(&mut conn),
                )
                .await?;

            count += keys.len();
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(count)
    }
}
