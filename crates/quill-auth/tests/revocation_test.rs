//! Revocation registry semantics, including the fail-closed path.

mod helpers;

use chrono::Duration;
use quill_core::traits::clock::Clock;

use helpers::Harness;

#[tokio::test]
async fn test_revoked_token_is_flagged() {
    let h = Harness::new();
    let expires = h.clock.now() + Duration::hours(1);

    assert!(!h.revocation.is_revoked("some.jwt.token").await);
    h.revocation
        .add("some.jwt.token", expires, "logout")
        .await
        .unwrap();
    assert!(h.revocation.is_revoked("some.jwt.token").await);
    assert!(!h.revocation.is_revoked("another.jwt.token").await);
}

#[tokio::test]
async fn test_entry_carries_audit_fields() {
    let h = Harness::new();
    let now = h.clock.now();
    let expires = now + Duration::hours(1);
    h.revocation
        .add("some.jwt.token", expires, "password change")
        .await
        .unwrap();

    let entry = h.revocation.entry("some.jwt.token").await.unwrap().unwrap();
    assert_eq!(entry.reason, "password change");
    assert_eq!(entry.recorded_at, now);
    assert_eq!(entry.expires_at, expires);
    assert_eq!(entry.token_hash.len(), 64);
}

#[tokio::test]
async fn test_revocation_lapses_with_the_token() {
    let h = Harness::new();
    let expires = h.clock.now() + Duration::hours(1);
    h.revocation
        .add("some.jwt.token", expires, "logout")
        .await
        .unwrap();

    h.advance_secs(3601);
    // The detail record is gone even before cleanup runs.
    assert!(h.revocation.entry("some.jwt.token").await.unwrap().is_none());
}

#[tokio::test]
async fn test_already_expired_token_gets_minimum_retention() {
    let h = Harness::new();
    let expires = h.clock.now() - Duration::hours(1);
    h.revocation
        .add("stale.jwt.token", expires, "logout")
        .await
        .unwrap();

    // Held for the floor window despite being past expiry.
    assert!(h.revocation.is_revoked("stale.jwt.token").await);
    assert!(h.revocation.entry("stale.jwt.token").await.unwrap().is_some());
}

#[tokio::test]
async fn test_cleanup_prunes_only_lapsed_entries_and_is_idempotent() {
    let h = Harness::new();
    let now = h.clock.now();
    h.revocation
        .add("short.jwt.token", now + Duration::minutes(30), "logout")
        .await
        .unwrap();
    h.revocation
        .add("long.jwt.token", now + Duration::hours(10), "logout")
        .await
        .unwrap();

    h.advance_secs(3600);
    assert_eq!(h.revocation.cleanup_expired().await.unwrap(), 1);
    assert_eq!(h.revocation.cleanup_expired().await.unwrap(), 0);

    assert!(!h.revocation.is_revoked("short.jwt.token").await);
    assert!(h.revocation.is_revoked("long.jwt.token").await);
}

#[tokio::test]
async fn test_store_error_reads_as_revoked() {
    let h = Harness::broken();
    assert!(h.revocation.is_revoked("any.jwt.token").await);
}
