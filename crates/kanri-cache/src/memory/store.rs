//! In-memory cache implementation using moka and dashmap.
//!
//! Per-entry TTLs are tracked in a side map of deadlines and enforced
//! lazily on read, since token revocation correctness depends on keys
//! expiring individually rather than at a cache-wide TTL.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;

use kanri_core::config::cache::MemoryCacheConfig;
use kanri_core::result::AppResult;
use kanri_core::traits::cache::CacheProvider;

/// In-memory cache provider.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// String values.
    values: Cache<String, String>,
    /// Hash values (key → field → value).
    hashes: Arc<dashmap::DashMap<String, BTreeMap<String, String>>>,
    /// Expiry deadline per key. `None` means the key never expires.
    deadlines: Arc<dashmap::DashMap<String, Option<Instant>>>,
    /// Counters stored separately for atomic incr.
    counters: Arc<dashmap::DashMap<String, AtomicI64>>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let values = Cache::builder().max_capacity(config.max_capacity).build();

        Self {
            values,
            hashes: Arc::new(dashmap::DashMap::new()),
            deadlines: Arc::new(dashmap::DashMap::new()),
            counters: Arc::new(dashmap::DashMap::new()),
        }
    }

    /// Evict the key from every map if its deadline has passed.
    /// Returns `true` when the key is expired (and now gone).
    async fn evict_if_expired(&self, key: &str) -> bool {
        let expired = match self.deadlines.get(key) {
            Some(entry) => matches!(*entry.value(), Some(deadline) if deadline <= Instant::now()),
            None => false,
        };
        if expired {
            self.remove_everywhere(key).await;
        }
        expired
    }

    async fn remove_everywhere(&self, key: &str) {
        self.values.invalidate(key).await;
        self.hashes.remove(key);
        self.deadlines.remove(key);
        self.counters.remove(key);
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        if self.evict_if_expired(key).await {
            return Ok(None);
        }
        Ok(self.values.get(key).await)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.values.insert(key.to_string(), value.to_string()).await;
        self.deadlines
            .insert(key.to_string(), Some(Instant::now() + ttl));
        Ok(())
    }

    async fn set_persistent(&self, key: &str, value: &str) -> AppResult<()> {
        self.values.insert(key.to_string(), value.to_string()).await;
        self.deadlines.insert(key.to_string(), None);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.remove_everywhere(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        if self.evict_if_expired(key).await {
            return Ok(false);
        }
        Ok(self.values.contains_key(key) || self.hashes.contains_key(key))
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        // Expired counters restart from zero, same as Redis.
        self.evict_if_expired(key).await;
        let start = self
            .values
            .get(key)
            .await
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| AtomicI64::new(start));
        let new_val = entry.value().fetch_add(1, Ordering::SeqCst) + 1;
        drop(entry);
        // Mirror into the value map so get() observes the counter.
        self.values
            .insert(key.to_string(), new_val.to_string())
            .await;
        self.deadlines.entry(key.to_string()).or_insert(None);
        Ok(new_val)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        if self.evict_if_expired(key).await {
            return Ok(false);
        }
        if self.values.contains_key(key) || self.hashes.contains_key(key) {
            self.deadlines
                .insert(key.to_string(), Some(Instant::now() + ttl));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> AppResult<Option<String>> {
        if self.evict_if_expired(key).await {
            return Ok(None);
        }
        Ok(self
            .hashes
            .get(key)
            .and_then(|map| map.get(field).cloned()))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> AppResult<()> {
        self.evict_if_expired(key).await;
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        self.deadlines.entry(key.to_string()).or_insert(None);
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> AppResult<()> {
        if self.evict_if_expired(key).await {
            return Ok(());
        }
        if let Some(mut map) = self.hashes.get_mut(key) {
            map.remove(field);
        }
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 1000 })
    }

    #[tokio::test]
    async fn test_set_get() {
        let provider = make_provider();
        provider
            .set("key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();
        let val = provider.get("key1").await.unwrap();
        assert_eq!(val, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_expired_key_is_gone() {
        let provider = make_provider();
        provider
            .set("gone", "v", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(provider.get("gone").await.unwrap(), None);
        assert!(!provider.exists("gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_persistent_key_survives() {
        let provider = make_provider();
        provider.set_persistent("keep", "v").await.unwrap();
        assert_eq!(provider.get("keep").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let provider = make_provider();
        provider
            .set("key2", "value2", Duration::from_secs(60))
            .await
            .unwrap();
        provider.delete("key2").await.unwrap();
        assert_eq!(provider.get("key2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_is_monotonic() {
        let provider = make_provider();
        assert_eq!(provider.incr("counter").await.unwrap(), 1);
        assert_eq!(provider.incr("counter").await.unwrap(), 2);
        assert_eq!(
            provider.get("counter").await.unwrap(),
            Some("2".to_string())
        );
    }

    #[tokio::test]
    async fn test_hash_roundtrip() {
        let provider = make_provider();
        provider.hash_set("h", "f1", "a").await.unwrap();
        provider.hash_set("h", "f2", "b").await.unwrap();
        assert_eq!(
            provider.hash_get("h", "f1").await.unwrap(),
            Some("a".to_string())
        );
        provider.hash_delete("h", "f1").await.unwrap();
        assert_eq!(provider.hash_get("h", "f1").await.unwrap(), None);
        assert_eq!(
            provider.hash_get("h", "f2").await.unwrap(),
            Some("b".to_string())
        );
    }

    #[tokio::test]
    async fn test_expire_on_hash() {
        let provider = make_provider();
        provider.hash_set("h2", "f", "v").await.unwrap();
        assert!(provider.expire("h2", Duration::from_millis(1)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(provider.hash_get("h2", "f").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let provider = make_provider();
        let data = serde_json::json!({"name": "test", "count": 42});
        provider
            .set_json("json_key", &data, Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<serde_json::Value> = provider.get_json("json_key").await.unwrap();
        assert_eq!(result, Some(data));
    }
}
