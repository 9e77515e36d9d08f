//! In-memory store implementation using dashmap.
//!
//! Every logical operation locks only the shard holding its key, so
//! unrelated sessions never serialize on each other. Expiry is lazy:
//! an entry past its deadline is removed on first access, mirroring
//! the expire-on-read behavior of the Redis backend.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::traits::cache::CacheProvider;
use quill_core::traits::clock::Clock;

/// A stored value: either a scalar string or a membership set.
#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Set(HashSet<String>),
}

/// A cache entry with its expiry deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// In-memory cache provider with per-key TTLs.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// Sharded entry map.
    entries: Arc<DashMap<String, Entry>>,
    /// Default TTL for entries.
    default_ttl: Duration,
    /// Time source for expiry checks.
    clock: Arc<dyn Clock>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache.
    pub fn new(default_ttl_seconds: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
            clock,
        }
    }

    fn deadline(&self, ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX);
        self.clock.now() + ttl
    }

    /// Remove the entry if it has expired. Returns `true` if a live entry remains.
    fn prune_expired(&self, key: &str) -> bool {
        let now = self.clock.now();
        let live = match self.entries.get(key) {
            Some(entry) => entry.expires_at > now,
            None => return false,
        };
        if !live {
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
        }
        live
    }

    fn wrong_type(key: &str) -> AppError {
        AppError::cache(format!("Key '{key}' holds a value of the wrong type"))
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        if !self.prune_expired(key) {
            return Ok(None);
        }
        match self.entries.get(key).map(|e| e.value.clone()) {
            Some(Value::Scalar(s)) => Ok(Some(s)),
            Some(Value::Set(_)) => Err(Self::wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value.to_string()),
                expires_at: self.deadline(ttl),
            },
        );
        Ok(())
    }

    async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.set(key, value, self.default_ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let now = self.clock.now();
        let fresh = Entry {
            value: Value::Scalar(value.to_string()),
            expires_at: self.deadline(ttl),
        };
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().expires_at <= now {
                    occupied.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let now = self.clock.now();
        match self.entries.remove(key) {
            Some((_, entry)) => Ok(entry.expires_at > now),
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.prune_expired(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        if !self.prune_expired(key) {
            return Ok(false);
        }
        let deadline = self.deadline(ttl);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = deadline;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> AppResult<()> {
        let now = self.clock.now();
        let deadline = self.deadline(ttl);
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.expires_at <= now {
                    let mut members = HashSet::new();
                    members.insert(member.to_string());
                    *entry = Entry {
                        value: Value::Set(members),
                        expires_at: deadline,
                    };
                    return Ok(());
                }
                match &mut entry.value {
                    Value::Set(members) => {
                        members.insert(member.to_string());
                        entry.expires_at = deadline;
                        Ok(())
                    }
                    Value::Scalar(_) => Err(Self::wrong_type(key)),
                }
            }
            MapEntry::Vacant(vacant) => {
                let mut members = HashSet::new();
                members.insert(member.to_string());
                vacant.insert(Entry {
                    value: Value::Set(members),
                    expires_at: deadline,
                });
                Ok(())
            }
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        if !self.prune_expired(key) {
            return Ok(false);
        }
        match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::Set(members) => Ok(members.remove(member)),
                Value::Scalar(_) => Err(Self::wrong_type(key)),
            },
            None => Ok(false),
        }
    }

    async fn set_contains(&self, key: &str, member: &str) -> AppResult<bool> {
        if !self.prune_expired(key) {
            return Ok(false);
        }
        match self.entries.get(key).map(|e| e.value.clone()) {
            Some(Value::Set(members)) => Ok(members.contains(member)),
            Some(Value::Scalar(_)) => Err(Self::wrong_type(key)),
            None => Ok(false),
        }
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        if !self.prune_expired(key) {
            return Ok(Vec::new());
        }
        match self.entries.get(key).map(|e| e.value.clone()) {
            Some(Value::Set(members)) => Ok(members.into_iter().collect()),
            Some(Value::Scalar(_)) => Err(Self::wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.entries.clear();
        Ok(())
    }
}
