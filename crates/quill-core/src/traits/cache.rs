//! Cache provider trait for the shared key-value backing store.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for the shared backing store (Redis or in-memory).
///
/// All values are serialized as strings (JSON). Every mutation is an
/// atomic single-key or single-set operation; the provider enforces
/// per-key TTLs and owns key prefixing.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value with the default TTL.
    async fn set_default(&self, key: &str, value: &str) -> AppResult<()>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set, `false` if the key already existed.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Delete a key. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Set the TTL on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// Add a member to a set and refresh the set's TTL.
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> AppResult<()>;

    /// Remove a member from a set. Returns `true` if the member was present.
    async fn set_remove(&self, key: &str, member: &str) -> AppResult<bool>;

    /// Check set membership.
    async fn set_contains(&self, key: &str, member: &str) -> AppResult<bool>;

    /// List all members of a set. An absent set yields an empty list.
    async fn set_members(&self, key: &str) -> AppResult<Vec<String>>;

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

    /// Flush all entries from the cache.
    async fn flush_all(&self) -> AppResult<()>;
}
