//! `PostgreSQL` implementation of the `KeyValueStore` trait.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use tracing::debug;
use whiteroom_core::error::DomainError;
use whiteroom_core::store::KeyValueStore;

const SELECT_LIVE_VALUE: &str =
    "SELECT value FROM session_entries WHERE key = $1 AND expires_at > NOW()";

const UPSERT_VALUE: &str = r"
INSERT INTO session_entries (key, value, expires_at, updated_at)
VALUES ($1, $2, NOW() + make_interval(secs => $3), NOW())
ON CONFLICT (key) DO UPDATE
    SET value = EXCLUDED.value,
        expires_at = EXCLUDED.expires_at,
        updated_at = EXCLUDED.updated_at
";

const DELETE_EXPIRED: &str = "DELETE FROM session_entries WHERE expires_at <= NOW()";

fn persistence(context: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Persistence(format!("{context}: {err}"))
}

/// PostgreSQL-backed expiring store. Expired rows are invisible to reads and
/// removed by [`PgKeyValueStore::purge_expired`].
#[derive(Debug, Clone)]
pub struct PgKeyValueStore {
    pool: PgPool,
}

impl PgKeyValueStore {
    /// Creates a new `PgKeyValueStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError` if a migration fails to apply.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Deletes expired rows and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, DomainError> {
        let result = sqlx::query(DELETE_EXPIRED)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence("purge failed", &e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl KeyValueStore for PgKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar::<_, String>(SELECT_LIVE_VALUE)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persistence(&format!("read of {key} failed"), &e))
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        sqlx::query(UPSERT_VALUE)
            .bind(key)
            .bind(value)
            .bind(ttl.as_secs_f64())
            .execute(&self.pool)
            .await
            .map_err(|e| persistence(&format!("write of {key} failed"), &e))?;
        debug!(key, ttl_secs = ttl.as_secs(), "entry stored");
        Ok(())
    }
}
