//! Time-bounded denylist of revoked tokens.
//!
//! Tokens are never stored raw; the registry keys everything by a
//! SHA-256 hash. Two structures live in the shared store: one detail
//! record per revocation (reason, timestamps) with its own TTL, and an
//! all-hashes membership set for O(1) lookups. A hash whose detail
//! record has already expired is still treated as revoked until the
//! next cleanup prunes it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use quill_cache::keys;
use quill_cache::provider::CacheManager;
use quill_core::result::AppResult;
use quill_core::traits::cache::CacheProvider;
use quill_core::traits::clock::Clock;

/// Minimum retention for a revocation, guarding against clock skew.
const MIN_RETENTION: Duration = Duration::from_secs(60);

/// Audit record for one revoked token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// SHA-256 hex of the revoked token.
    pub token_hash: String,
    /// When the revocation was recorded.
    pub recorded_at: DateTime<Utc>,
    /// When the underlying token would have expired anyway.
    pub expires_at: DateTime<Utc>,
    /// Why the token was revoked.
    pub reason: String,
}

/// Denylist of tokens that must be rejected before their natural expiry.
#[derive(Debug, Clone)]
pub struct RevocationRegistry {
    /// Shared backing store.
    cache: Arc<CacheManager>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// TTL applied to the membership set on every add. Must cover the
    /// longest-lived token so a later short revocation cannot shorten
    /// the set's life under an earlier long one.
    set_ttl: Duration,
}

impl RevocationRegistry {
    /// Creates a new registry. `max_token_ttl` is the longest TTL any
    /// token can carry (the refresh-token TTL).
    pub fn new(cache: Arc<CacheManager>, clock: Arc<dyn Clock>, max_token_ttl: Duration) -> Self {
        Self {
            cache,
            clock,
            set_ttl: max_token_ttl.max(MIN_RETENTION),
        }
    }

    /// Records a token as revoked.
    ///
    /// Retention is bounded by the token's remaining lifetime: once the
    /// token would have expired anyway, the entry lapses with it.
    pub async fn add(
        &self,
        token: &str,
        token_expires_at: DateTime<Utc>,
        reason: &str,
    ) -> AppResult<()> {
        let now = self.clock.now();
        let remaining = (token_expires_at - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let retention = remaining.max(MIN_RETENTION);

        let hash = hash_token(token);
        let entry = RevocationEntry {
            token_hash: hash.clone(),
            recorded_at: now,
            expires_at: token_expires_at,
            reason: reason.to_string(),
        };

        self.cache
            .set_json(&keys::revocation_entry(&hash), &entry, retention)
            .await?;
        self.cache
            .set_add(&keys::revocation_set(), &hash, self.set_ttl)
            .await?;

        info!(reason, retention_seconds = retention.as_secs(), "Token revoked");
        Ok(())
    }

    /// Checks whether a token has been revoked.
    ///
    /// Conservative: a store error is reported as "revoked" so that an
    /// unreachable backing store can never let a denylisted token pass.
    pub async fn is_revoked(&self, token: &str) -> bool {
        let hash = hash_token(token);
        match self
            .cache
            .set_contains(&keys::revocation_set(), &hash)
            .await
        {
            Ok(revoked) => revoked,
            Err(e) => {
                warn!(error = %e, "Revocation lookup failed, treating token as revoked");
                true
            }
        }
    }

    /// Fetches the audit record for a revoked token, if it still exists.
    pub async fn entry(&self, token: &str) -> AppResult<Option<RevocationEntry>> {
        let hash = hash_token(token);
        self.cache.get_json(&keys::revocation_entry(&hash)).await
    }

    /// Prunes membership-set entries whose detail record has expired.
    ///
    /// Idempotent and safe to run concurrently with lookups: only
    /// members already past their own expiry are removed, so a live
    /// revocation can never race into a false negative.
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        let members = self.cache.set_members(&keys::revocation_set()).await?;
        let mut removed = 0u64;

        for hash in &members {
            let alive = self.cache.exists(&keys::revocation_entry(hash)).await?;
            if !alive && self.cache.set_remove(&keys::revocation_set(), hash).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, "Pruned expired revocation entries");
        }
        Ok(removed)
    }
}

/// SHA-256 hex digest of a token. Raw bearer secrets never hit the store.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_hex() {
        let h1 = hash_token("abc");
        let h2 = hash_token("abc");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash_token("abd"), h1);
    }
}
