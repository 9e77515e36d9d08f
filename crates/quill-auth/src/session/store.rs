//! Cache-backed session store.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use quill_cache::keys;
use quill_cache::provider::CacheManager;
use quill_core::config::session::SessionConfig;
use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::traits::cache::CacheProvider;
use quill_core::traits::clock::Clock;

use crate::error::AuthRejection;

use super::model::{Session, SessionMetadata};

/// Store for session records, keyed by session id with a per-user
/// secondary index.
///
/// Expiry is enforced twice: the cache evicts records at their TTL, and
/// every read re-checks `expires_at` so a record surviving in a store
/// with coarser eviction still reads as absent once stale.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cache: Arc<CacheManager>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cache: Arc<CacheManager>, clock: Arc<dyn Clock>, config: &SessionConfig) -> Self {
        Self {
            cache,
            clock,
            ttl: Duration::from_secs(config.ttl_seconds),
        }
    }

    /// Session lifetime granted at creation.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Creates and persists a new session for a user.
    pub async fn create(&self, user_id: Uuid, metadata: SessionMetadata) -> AppResult<Session> {
        let now = self.clock.now();
        let session = Session::new(
            user_id,
            metadata,
            now,
            chrono::Duration::from_std(self.ttl).unwrap_or(chrono::TimeDelta::MAX),
        );

        let json = serde_json::to_string(&session)?;
        let created = self
            .cache
            .set_nx(&keys::session_by_id(session.session_id), &json, self.ttl)
            .await?;
        if !created {
            // v4 ids do not collide in practice; an existing key means
            // the store is corrupt or an attacker is racing us.
            return Err(AppError::internal(format!(
                "Session id collision: {}",
                session.session_id
            )));
        }

        self.index_session(&session).await?;

        info!(
            user_id = %user_id,
            session_id = %session.session_id,
            "Session created"
        );
        Ok(session)
    }

    /// Fetches a session by id.
    ///
    /// A record past its `expires_at` is deleted on the spot and
    /// reported as absent. Deactivated sessions are still returned;
    /// callers decide whether inactive is acceptable.
    pub async fn get(&self, session_id: Uuid) -> AppResult<Option<Session>> {
        let key = keys::session_by_id(session_id);
        let Some(session) = self.cache.get_json::<Session>(&key).await? else {
            return Ok(None);
        };

        if session.is_expired(self.clock.now()) {
            debug!(session_id = %session_id, "Session expired on read, removing");
            self.remove_record(&session).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Resolves a session that must be live, optionally bound to a user.
    ///
    /// Rejections are ordered: absent/expired, then inactive, then
    /// owner mismatch.
    pub async fn validate(
        &self,
        session_id: Uuid,
        expected_user: Option<Uuid>,
    ) -> Result<Session, AuthRejection> {
        let session = self
            .get(session_id)
            .await?
            .ok_or(AuthRejection::SessionExpired)?;
        if !session.is_active {
            return Err(AuthRejection::SessionInactive);
        }
        if let Some(user_id) = expected_user
            && session.user_id != user_id
        {
            warn!(
                session_id = %session_id,
                expected_user = %user_id,
                actual_user = %session.user_id,
                "Session owner mismatch"
            );
            return Err(AuthRejection::SessionMismatch);
        }
        Ok(session)
    }

    /// Records activity on a session without extending its life.
    pub async fn touch(&self, session_id: Uuid) -> AppResult<()> {
        if let Some(mut session) = self.get(session_id).await? {
            session.last_activity = self.clock.now();
            self.write_preserving_expiry(&session).await?;
        }
        Ok(())
    }

    /// Pushes a session's hard expiry further out.
    pub async fn extend(&self, session_id: Uuid, additional: Duration) -> AppResult<Option<Session>> {
        let Some(mut session) = self.get(session_id).await? else {
            return Ok(None);
        };
        session.expires_at += chrono::Duration::from_std(additional)
            .unwrap_or(chrono::TimeDelta::MAX);
        session.last_activity = self.clock.now();
        self.write_preserving_expiry(&session).await?;
        self.index_session(&session).await?;
        Ok(Some(session))
    }

    /// Marks a session inactive while keeping the record for audit.
    /// Returns `false` if the session no longer exists.
    pub async fn deactivate(&self, session_id: Uuid) -> AppResult<bool> {
        let Some(mut session) = self.get(session_id).await? else {
            return Ok(false);
        };
        session.is_active = false;
        self.write_preserving_expiry(&session).await?;
        info!(session_id = %session_id, user_id = %session.user_id, "Session deactivated");
        Ok(true)
    }

    /// Folds a received heartbeat into the session's counters.
    pub async fn apply_heartbeat(&self, session_id: Uuid) -> AppResult<()> {
        if let Some(mut session) = self.get(session_id).await? {
            session.heartbeat_count += 1;
            session.missed_heartbeats = 0;
            session.last_activity = self.clock.now();
            self.write_preserving_expiry(&session).await?;
        }
        Ok(())
    }

    /// Increments the missed-heartbeat counter. Returns the new count,
    /// or `None` if the session is gone.
    pub async fn apply_missed(&self, session_id: Uuid) -> AppResult<Option<u32>> {
        let Some(mut session) = self.get(session_id).await? else {
            return Ok(None);
        };
        session.missed_heartbeats += 1;
        self.write_preserving_expiry(&session).await?;
        Ok(Some(session.missed_heartbeats))
    }

    /// Deletes a session record and its index entry.
    /// Returns `true` if the record existed.
    pub async fn delete(&self, session_id: Uuid) -> AppResult<bool> {
        let key = keys::session_by_id(session_id);
        let Some(session) = self.cache.get_json::<Session>(&key).await? else {
            return Ok(false);
        };
        self.remove_record(&session).await?;
        info!(session_id = %session_id, user_id = %session.user_id, "Session deleted");
        Ok(true)
    }

    /// All still-valid sessions owned by a user.
    ///
    /// Dangling index entries (a record evicted out from under its
    /// index) are pruned as they are discovered.
    pub async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let index_key = keys::user_session_index(user_id);
        let ids = self.cache.set_members(&index_key).await?;

        let mut sessions = Vec::with_capacity(ids.len());
        for raw in ids {
            let Ok(session_id) = raw.parse::<Uuid>() else {
                self.cache.set_remove(&index_key, &raw).await?;
                continue;
            };
            match self.get(session_id).await? {
                Some(session) if session.user_id == user_id => sessions.push(session),
                _ => {
                    self.cache.set_remove(&index_key, &raw).await?;
                }
            }
        }
        Ok(sessions)
    }

    /// Deletes every session a user owns, optionally sparing one.
    /// Returns the number of sessions removed.
    pub async fn invalidate_all_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
    ) -> AppResult<u64> {
        let mut removed = 0u64;
        for session in self.list_by_user(user_id).await? {
            if Some(session.session_id) == except {
                continue;
            }
            // Best-effort per session: one failed delete must not stop
            // the rest, and the count reflects actual removals.
            match self.delete(session.session_id).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        error = %e,
                        session_id = %session.session_id,
                        "Failed to delete session during invalidation"
                    );
                }
            }
        }
        if removed > 0 {
            info!(user_id = %user_id, removed, "Invalidated user sessions");
        }
        Ok(removed)
    }

    /// User ids that currently appear in the session roster.
    pub async fn roster(&self) -> AppResult<Vec<Uuid>> {
        let members = self.cache.set_members(&keys::session_user_roster()).await?;
        Ok(members.iter().filter_map(|m| m.parse().ok()).collect())
    }

    /// Drops a user from the roster once they hold no sessions.
    pub async fn prune_roster_entry(&self, user_id: Uuid) -> AppResult<()> {
        if self.list_by_user(user_id).await?.is_empty() {
            self.cache
                .set_remove(&keys::session_user_roster(), &user_id.to_string())
                .await?;
        }
        Ok(())
    }

    async fn index_session(&self, session: &Session) -> AppResult<()> {
        let remaining = self.remaining_ttl(session).max(self.ttl);
        self.cache
            .set_add(
                &keys::user_session_index(session.user_id),
                &session.session_id.to_string(),
                remaining,
            )
            .await?;
        self.cache
            .set_add(
                &keys::session_user_roster(),
                &session.user_id.to_string(),
                remaining,
            )
            .await
    }

    /// Rewrites a record keeping its TTL aligned with `expires_at`.
    async fn write_preserving_expiry(&self, session: &Session) -> AppResult<()> {
        let remaining = self.remaining_ttl(session);
        self.cache
            .set_json(&keys::session_by_id(session.session_id), session, remaining)
            .await
    }

    fn remaining_ttl(&self, session: &Session) -> Duration {
        (session.expires_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
            .max(Duration::from_secs(1))
    }

    async fn remove_record(&self, session: &Session) -> AppResult<()> {
        self.cache
            .delete(&keys::session_by_id(session.session_id))
            .await?;
        self.cache
            .set_remove(
                &keys::user_session_index(session.user_id),
                &session.session_id.to_string(),
            )
            .await?;
        Ok(())
    }
}
