use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{check_ttl, SessionCache};
use crate::error::CacheError;

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local cache. Expired entries are invisible to reads and are
/// dropped by [`SessionCache::purge_expired`].
#[derive(Default)]
pub struct InMemorySessionCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn set_with_expiry(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), CacheError> {
        check_ttl(key, ttl)?;

        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at - now))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemorySessionCache::new();
        cache
            .set_with_expiry("refresh:1", Duration::from_secs(60), "token")
            .await
            .unwrap();

        assert_eq!(cache.get("refresh:1").await.unwrap(), Some("token".to_string()));
        let ttl = cache.ttl("refresh:1").await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(60) && ttl > Duration::from_secs(58));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let cache = InMemorySessionCache::new();
        cache
            .set_with_expiry("access:1", Duration::from_secs(5), "old")
            .await
            .unwrap();
        cache
            .set_with_expiry("access:1", Duration::from_secs(500), "new")
            .await
            .unwrap();

        assert_eq!(cache.get("access:1").await.unwrap(), Some("new".to_string()));
        assert!(cache.ttl("access:1").await.unwrap().unwrap() > Duration::from_secs(5));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_hidden_and_purged() {
        let cache = InMemorySessionCache::new();
        cache
            .set_with_expiry("access:1", Duration::from_millis(5), "token")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.get("access:1").await.unwrap(), None);
        assert_eq!(cache.ttl("access:1").await.unwrap(), None);
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemorySessionCache::new();
        cache
            .set_with_expiry("refresh:1", Duration::from_secs(60), "token")
            .await
            .unwrap();
        cache.delete("refresh:1").await.unwrap();
        cache.delete("refresh:missing").await.unwrap();

        assert_eq!(cache.get("refresh:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected() {
        let cache = InMemorySessionCache::new();
        let result = cache.set_with_expiry("access:1", Duration::ZERO, "token").await;
        assert_eq!(result, Err(CacheError::InvalidTtl("access:1".to_string())));
        assert!(cache.is_empty().await);
    }
}
