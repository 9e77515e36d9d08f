//! Session record stored in the shared cache.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client details captured when a session is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Remote address of the client, when known.
    pub client_ip: Option<IpAddr>,
    /// User-Agent string of the client, when known.
    pub user_agent: Option<String>,
}

/// One authenticated session.
///
/// The record is the source of truth for whether a user is allowed to
/// keep using their tokens: a token bound to a session that is expired,
/// deactivated, or deleted is rejected regardless of its own validity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub session_id: Uuid,
    /// Owner of the session.
    pub user_id: Uuid,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last time the session saw authenticated activity.
    pub last_activity: DateTime<Utc>,
    /// Hard expiry; the session is invalid past this instant.
    pub expires_at: DateTime<Utc>,
    /// Deactivated sessions stay readable for audit but reject auth.
    pub is_active: bool,
    /// Remote address recorded at creation.
    pub client_ip: Option<IpAddr>,
    /// User-Agent recorded at creation.
    pub user_agent: Option<String>,
    /// Total heartbeats received over the session's life.
    pub heartbeat_count: u64,
    /// Consecutive missed heartbeat intervals.
    pub missed_heartbeats: u32,
}

impl Session {
    /// Builds a fresh session record.
    pub fn new(
        user_id: Uuid,
        metadata: SessionMetadata,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            created_at: now,
            last_activity: now,
            expires_at: now + ttl,
            is_active: true,
            client_ip: metadata.client_ip,
            user_agent: metadata.user_agent,
            heartbeat_count: 0,
            missed_heartbeats: 0,
        }
    }

    /// Whether the session is past its hard expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the session may still authenticate requests.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }

    /// Seconds since the last recorded activity, saturating at zero.
    pub fn idle_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_activity).num_seconds().max(0)
    }
}
