//! Cache provider trait for pluggable session-cache backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for session-cache backends (Redis or in-memory).
///
/// All values are serialized as strings (JSON). Single-key and
/// single-field operations are atomic; multi-key sequences are not, and
/// callers must order their writes so that partial failure leaves a
/// safely-rejectable state.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value with no expiry.
    async fn set_persistent(&self, key: &str, value: &str) -> AppResult<()>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a key exists in the cache.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Increment an integer value by 1. Missing keys start at 0.
    /// Returns the new value.
    async fn incr(&self, key: &str) -> AppResult<i64>;

    /// Set the TTL on an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// Get a field from a hash. Returns `None` if the key or field is absent.
    async fn hash_get(&self, key: &str, field: &str) -> AppResult<Option<String>>;

    /// Set a field in a hash. Creates the hash if it does not exist.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> AppResult<()>;

    /// Delete a field from a hash.
    async fn hash_delete(&self, key: &str, field: &str) -> AppResult<()>;

    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key).await? {
            Some(value) => {
                let parsed = serde_json::from_str(&value)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl).await
    }

    /// Check that the cache backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
