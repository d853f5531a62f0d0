use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::{check_ttl, SessionCache};
use crate::error::CacheError;

/// Cache stored in the `session_cache` table.
///
/// Expiry is an `expires_at` column: reads ignore expired rows and
/// [`SessionCache::purge_expired`] deletes them.
#[derive(Clone)]
pub struct PgSessionCache {
    pool: PgPool,
}

impl PgSessionCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionCache for PgSessionCache {
    async fn set_with_expiry(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), CacheError> {
        check_ttl(key, ttl)?;

        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| CacheError::InvalidTtl(key.to_string()))?;
        let expires_at = Utc::now() + ttl;

        sqlx::query(
            r#"
            INSERT INTO session_cache (key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        sqlx::query_scalar::<_, String>(
            "SELECT value FROM session_cache WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CacheError::ReadFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let expires_at = sqlx::query_scalar::<_, chrono::DateTime<Utc>>(
            "SELECT expires_at FROM session_cache WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CacheError::ReadFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        Ok(expires_at.and_then(|at| (at - Utc::now()).to_std().ok()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM session_cache WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::DeleteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM session_cache WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::DeleteFailed {
                key: "*".to_string(),
                reason: e.to_string(),
            })?;

        let removed = result.rows_affected();
        if removed > 0 {
            tracing::info!(removed, "Expired session entries deleted");
        }
        Ok(removed)
    }
}
