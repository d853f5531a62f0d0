/// Session cache
///
/// Key-value storage with per-key expiry for issued tokens. Entries are
/// keyed `<kind>:<user id>` and a write replaces any previous value for
/// the key.

mod memory;
mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::CacheError;

pub use memory::InMemorySessionCache;
pub use postgres::PgSessionCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Cache key for a user's token of the given kind, e.g. `refresh:<id>`
pub fn session_key(kind: TokenKind, user_id: &Uuid) -> String {
    format!("{}:{}", kind.prefix(), user_id)
}

#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Store `value` under `key` for `ttl`, replacing any existing entry
    async fn set_with_expiry(&self, key: &str, ttl: Duration, value: &str)
        -> Result<(), CacheError>;

    /// Live value for `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Remaining lifetime of `key`, `None` if absent or expired
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<u64, CacheError>;
}

pub(crate) fn check_ttl(key: &str, ttl: Duration) -> Result<(), CacheError> {
    if ttl.is_zero() {
        return Err(CacheError::InvalidTtl(key.to_string()));
    }
    Ok(())
}

/// Spawn a task that purges expired entries every `interval`.
///
/// The returned handle must be aborted on shutdown.
pub fn spawn_janitor(cache: Arc<dyn SessionCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match cache.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired session entries"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired session entries"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_format() {
        let id = Uuid::new_v4();
        assert_eq!(session_key(TokenKind::Access, &id), format!("access:{}", id));
        assert_eq!(session_key(TokenKind::Refresh, &id), format!("refresh:{}", id));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(check_ttl("access:1", Duration::ZERO).is_err());
        assert!(check_ttl("access:1", Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_janitor_purges_expired_entries() {
        let cache = Arc::new(InMemorySessionCache::new());
        cache
            .set_with_expiry("access:1", Duration::from_millis(10), "token")
            .await
            .unwrap();

        let handle = spawn_janitor(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(cache.len().await, 0);
    }
}
