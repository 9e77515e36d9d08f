//! Session store behavior: lifecycle, expiry, indexing.

mod helpers;

use std::time::Duration;

use quill_auth::error::AuthRejection;
use quill_auth::session::SessionMetadata;
use uuid::Uuid;

use helpers::Harness;

#[tokio::test]
async fn test_create_and_get() {
    let h = Harness::new();
    let user_id = Uuid::new_v4();
    let session = h
        .sessions
        .create(user_id, SessionMetadata::default())
        .await
        .unwrap();

    let loaded = h.sessions.get(session.session_id).await.unwrap().unwrap();
    assert_eq!(loaded.user_id, user_id);
    assert!(loaded.is_active);
    assert_eq!(loaded.heartbeat_count, 0);
}

#[tokio::test]
async fn test_metadata_is_persisted() {
    let h = Harness::new();
    let metadata = SessionMetadata {
        client_ip: Some("203.0.113.7".parse().unwrap()),
        user_agent: Some("Mozilla/5.0".to_string()),
    };
    let session = h.sessions.create(Uuid::new_v4(), metadata).await.unwrap();

    let loaded = h.sessions.get(session.session_id).await.unwrap().unwrap();
    assert_eq!(loaded.client_ip, Some("203.0.113.7".parse().unwrap()));
    assert_eq!(loaded.user_agent.as_deref(), Some("Mozilla/5.0"));
}

#[tokio::test]
async fn test_expired_session_reads_as_absent() {
    let h = Harness::new();
    let session = h
        .sessions
        .create(Uuid::new_v4(), SessionMetadata::default())
        .await
        .unwrap();

    // One second past the 24-hour TTL.
    h.advance_secs(24 * 3600 + 1);
    assert!(h.sessions.get(session.session_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_touch_does_not_extend_expiry() {
    let h = Harness::new();
    let session = h
        .sessions
        .create(Uuid::new_v4(), SessionMetadata::default())
        .await
        .unwrap();

    h.advance_secs(23 * 3600);
    h.sessions.touch(session.session_id).await.unwrap();

    let loaded = h.sessions.get(session.session_id).await.unwrap().unwrap();
    assert_eq!(loaded.expires_at, session.expires_at);
    assert!(loaded.last_activity > session.last_activity);

    h.advance_secs(3600 + 1);
    assert!(h.sessions.get(session.session_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_extend_pushes_expiry_out() {
    let h = Harness::new();
    let session = h
        .sessions
        .create(Uuid::new_v4(), SessionMetadata::default())
        .await
        .unwrap();

    h.sessions
        .extend(session.session_id, Duration::from_secs(3600))
        .await
        .unwrap()
        .unwrap();

    h.advance_secs(24 * 3600 + 1800);
    assert!(h.sessions.get(session.session_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_deactivated_session_fails_validation_but_stays_readable() {
    let h = Harness::new();
    let session = h
        .sessions
        .create(Uuid::new_v4(), SessionMetadata::default())
        .await
        .unwrap();

    assert!(h.sessions.deactivate(session.session_id).await.unwrap());

    let loaded = h.sessions.get(session.session_id).await.unwrap().unwrap();
    assert!(!loaded.is_active);

    let err = h
        .sessions
        .validate(session.session_id, None)
        .await
        .unwrap_err();
    assert_eq!(err, AuthRejection::SessionInactive);
}

#[tokio::test]
async fn test_validate_checks_ownership() {
    let h = Harness::new();
    let owner = Uuid::new_v4();
    let session = h
        .sessions
        .create(owner, SessionMetadata::default())
        .await
        .unwrap();

    assert!(
        h.sessions
            .validate(session.session_id, Some(owner))
            .await
            .is_ok()
    );
    let err = h
        .sessions
        .validate(session.session_id, Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err, AuthRejection::SessionMismatch);
}

#[tokio::test]
async fn test_delete_removes_session_and_index_entry() {
    let h = Harness::new();
    let user_id = Uuid::new_v4();
    let session = h
        .sessions
        .create(user_id, SessionMetadata::default())
        .await
        .unwrap();

    assert!(h.sessions.delete(session.session_id).await.unwrap());
    assert!(!h.sessions.delete(session.session_id).await.unwrap());
    assert!(h.sessions.list_by_user(user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_by_user_sees_only_live_sessions() {
    let h = Harness::new();
    let user_id = Uuid::new_v4();
    let s1 = h
        .sessions
        .create(user_id, SessionMetadata::default())
        .await
        .unwrap();
    let _s2 = h
        .sessions
        .create(user_id, SessionMetadata::default())
        .await
        .unwrap();

    assert_eq!(h.sessions.list_by_user(user_id).await.unwrap().len(), 2);

    h.sessions.delete(s1.session_id).await.unwrap();
    let remaining = h.sessions.list_by_user(user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_ne!(remaining[0].session_id, s1.session_id);
}

#[tokio::test]
async fn test_invalidate_all_spares_the_current_session() {
    let h = Harness::new();
    let user_id = Uuid::new_v4();
    let keep = h
        .sessions
        .create(user_id, SessionMetadata::default())
        .await
        .unwrap();
    for _ in 0..3 {
        h.sessions
            .create(user_id, SessionMetadata::default())
            .await
            .unwrap();
    }

    let removed = h
        .sessions
        .invalidate_all_for_user(user_id, Some(keep.session_id))
        .await
        .unwrap();
    assert_eq!(removed, 3);

    let remaining = h.sessions.list_by_user(user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].session_id, keep.session_id);
}

#[tokio::test]
async fn test_invalidation_continues_past_a_failed_delete() {
    let (h, flaky) = Harness::with_flaky_deletes();
    let user_id = Uuid::new_v4();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(
            h.sessions
                .create(user_id, SessionMetadata::default())
                .await
                .unwrap()
                .session_id,
        );
    }

    flaky.fail_deletes_containing(&ids[1].to_string());

    // One failing delete does not abort the rest, and the count
    // reflects what was actually removed.
    let removed = h
        .sessions
        .invalidate_all_for_user(user_id, None)
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let remaining = h.sessions.list_by_user(user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].session_id, ids[1]);
}

#[tokio::test]
async fn test_invalidation_is_isolated_per_user() {
    let h = Harness::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.sessions
        .create(alice, SessionMetadata::default())
        .await
        .unwrap();
    h.sessions
        .create(bob, SessionMetadata::default())
        .await
        .unwrap();

    let removed = h.sessions.invalidate_all_for_user(alice, None).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(h.sessions.list_by_user(bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_heartbeat_counters_roll_forward_and_reset() {
    let h = Harness::new();
    let session = h
        .sessions
        .create(Uuid::new_v4(), SessionMetadata::default())
        .await
        .unwrap();

    h.sessions.apply_heartbeat(session.session_id).await.unwrap();
    h.sessions.apply_heartbeat(session.session_id).await.unwrap();
    assert_eq!(
        h.sessions.apply_missed(session.session_id).await.unwrap(),
        Some(1)
    );

    let loaded = h.sessions.get(session.session_id).await.unwrap().unwrap();
    assert_eq!(loaded.heartbeat_count, 2);
    assert_eq!(loaded.missed_heartbeats, 1);

    // A heartbeat clears the missed streak.
    h.sessions.apply_heartbeat(session.session_id).await.unwrap();
    let loaded = h.sessions.get(session.session_id).await.unwrap().unwrap();
    assert_eq!(loaded.missed_heartbeats, 0);
}

#[tokio::test]
async fn test_roster_tracks_users_with_sessions() {
    let h = Harness::new();
    let user_id = Uuid::new_v4();
    let session = h
        .sessions
        .create(user_id, SessionMetadata::default())
        .await
        .unwrap();

    assert!(h.sessions.roster().await.unwrap().contains(&user_id));

    h.sessions.delete(session.session_id).await.unwrap();
    h.sessions.prune_roster_entry(user_id).await.unwrap();
    assert!(!h.sessions.roster().await.unwrap().contains(&user_id));
}
