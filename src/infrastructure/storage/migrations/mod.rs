//! Schema migrations for the tables the engine owns

use sqlx::postgres::PgPool;

use crate::domain::DomainError;

/// Forward-only schema change, identified by an increasing version
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

/// Schema owned by the engine; product tables are managed elsewhere
pub fn engine_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Create geo_cache table",
            up: r#"
            CREATE TABLE IF NOT EXISTS geo_cache (
                cache_key VARCHAR(255) PRIMARY KEY,
                namespace VARCHAR(32) NOT NULL,
                payload TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_geo_cache_expires_at ON geo_cache(expires_at);
            "#,
        },
        Migration {
            version: 2,
            description: "Index geo_cache by namespace",
            up: r#"
            CREATE INDEX IF NOT EXISTS idx_geo_cache_namespace ON geo_cache(namespace, expires_at);
            "#,
        },
    ]
}

/// Migrations not yet recorded in `applied`, in version order
fn pending<'a>(migrations: &'a [Migration], applied: &[i64]) -> Vec<&'a Migration> {
    let mut pending: Vec<_> = migrations
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect();
    pending.sort_by_key(|m| m.version);
    pending
}

/// Applies pending engine migrations and returns the resulting schema version
pub async fn run_migrations(pool: &PgPool) -> Result<Option<i64>, DomainError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _geo_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

    let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM _geo_migrations")
        .fetch_all(pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to read applied migrations: {}", e)))?;

    let migrations = engine_migrations();
    for migration in pending(&migrations, &applied) {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to open transaction: {}", e)))?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _geo_migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit migration {}: {}",
                migration.version, e
            ))
        })?;

        tracing::debug!(version = migration.version, "Applied migration");
    }

    let version = applied
        .iter()
        .copied()
        .chain(migrations.iter().map(|m| m.version))
        .max();
    tracing::info!(version = ?version, "Database migrations applied");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_migrations_ascending() {
        let migrations = engine_migrations();

        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
        assert!(migrations[0].up.contains("CREATE TABLE IF NOT EXISTS geo_cache"));
    }

    #[test]
    fn test_pending_skips_applied() {
        let migrations = engine_migrations();

        let all: Vec<i64> = pending(&migrations, &[]).iter().map(|m| m.version).collect();
        assert_eq!(all, vec![1, 2]);

        let rest: Vec<i64> = pending(&migrations, &[1]).iter().map(|m| m.version).collect();
        assert_eq!(rest, vec![2]);

        assert!(pending(&migrations, &[1, 2]).is_empty());
    }
}
