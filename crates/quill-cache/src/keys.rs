//! Cache key builders for all Quill auth-core entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the subsystem uses. Keys are built without a
//! namespace prefix; the Redis client applies its configured prefix,
//! so prefixing lives in exactly one layer.

use uuid::Uuid;

// ── Session keys ───────────────────────────────────────────

/// Cache key for a session record by ID.
pub fn session_by_id(session_id: Uuid) -> String {
    format!("session:{session_id}")
}

/// Set of session ids owned by a user (secondary index).
pub fn user_session_index(user_id: Uuid) -> String {
    format!("session:user:{user_id}")
}

/// Roster set of user ids that currently own sessions.
pub fn session_user_roster() -> String {
    "session:users".to_string()
}

// ── Revocation keys ────────────────────────────────────────

/// Detail record for a revoked token, keyed by token hash.
pub fn revocation_entry(token_hash: &str) -> String {
    format!("revoked:token:{token_hash}")
}

/// Membership set of all revoked token hashes.
pub fn revocation_set() -> String {
    "revoked:all".to_string()
}

// ── Heartbeat keys ─────────────────────────────────────────

/// An individual heartbeat history record.
pub fn heartbeat_record(session_id: Uuid, heartbeat_id: Uuid) -> String {
    format!("heartbeat:{session_id}:{heartbeat_id}")
}

/// Per-session heartbeat summary (last ping, counters).
pub fn heartbeat_summary(session_id: Uuid) -> String {
    format!("heartbeat:session:{session_id}")
}

/// Index set of heartbeat record ids for a session.
pub fn heartbeat_index(session_id: Uuid) -> String {
    format!("heartbeat:index:{session_id}")
}

/// Roster set of session ids with heartbeat history.
pub fn heartbeat_roster() -> String {
    "heartbeat:sessions".to_string()
}
