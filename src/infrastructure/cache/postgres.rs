//! Tier 3: durable fallback table in PostgreSQL

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::cache::{CacheEntry, CacheTier, PurgeOutcome, TierKind};
use crate::domain::DomainError;

/// Durable tier stored in the `geo_cache` table
#[derive(Debug, Clone)]
pub struct PostgresTier {
    pool: PgPool,
}

impl PostgresTier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Namespace segment of a `gm:<namespace>:<hash>` key
fn namespace_of(key: &str) -> &str {
    key.split(':').nth(1).unwrap_or("unknown")
}

#[async_trait]
impl CacheTier for PostgresTier {
    fn kind(&self) -> TierKind {
        TierKind::Durable
    }

    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT payload, expires_at
            FROM geo_cache
            WHERE cache_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::cache(format!("Failed to read cache row: {}", e)))?;

        row.map(|row| {
            let data: String = row
                .try_get("payload")
                .map_err(|e| DomainError::cache(format!("Invalid payload column: {}", e)))?;
            let expires_at: DateTime<Utc> = row
                .try_get("expires_at")
                .map_err(|e| DomainError::cache(format!("Invalid expires_at column: {}", e)))?;
            Ok(CacheEntry::new(data, expires_at))
        })
        .transpose()
    }

    async fn put_entry(
        &self,
        key: &str,
        entry: &CacheEntry,
        _ttl: Duration,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO geo_cache (cache_key, namespace, payload, expires_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (cache_key) DO UPDATE
            SET payload = EXCLUDED.payload,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(namespace_of(key))
        .bind(&entry.data)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::cache(format!("Failed to write cache row: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM geo_cache WHERE cache_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete cache row: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeOutcome, DomainError> {
        let freed: Vec<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM geo_cache
            WHERE expires_at <= $1
            RETURNING octet_length(payload)::BIGINT
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::cache(format!("Failed to purge cache rows: {}", e)))?;

        Ok(PurgeOutcome {
            items_removed: freed.len() as u64,
            bytes_freed: freed.iter().map(|b| (*b).max(0) as u64).sum(),
        })
    }

    async fn size(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM geo_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to count cache rows: {}", e)))?;

        Ok(count.max(0) as usize)
    }
}
