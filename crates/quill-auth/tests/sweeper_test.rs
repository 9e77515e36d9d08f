//! Sweeper cycles: missed-heartbeat deactivation and state pruning.

mod helpers;

use quill_auth::session::SessionMetadata;
use quill_auth::sweeper::CleanupSweeper;
use quill_core::config::session::SessionConfig;

use helpers::Harness;

fn sweeper(h: &Harness) -> CleanupSweeper {
    CleanupSweeper::new(
        h.sessions.clone(),
        h.heartbeats.clone(),
        h.revocation.clone(),
        &SessionConfig::default(),
    )
}

#[tokio::test]
async fn test_silent_session_is_deactivated_after_three_misses() {
    let h = Harness::new();
    let (user_id, outcome) = h.login_user().await;
    let session_id = outcome.session.session_id;
    h.heartbeats
        .record(session_id, user_id, &SessionMetadata::default())
        .await
        .unwrap();

    let sweeper = sweeper(&h);

    // Client goes silent. Each sweep past the timeout charges one miss.
    for _ in 0..3 {
        h.advance_secs(700);
        sweeper.sweep_once().await;
    }

    let session = h.sessions.get(session_id).await.unwrap().unwrap();
    assert!(!session.is_active);
    assert_eq!(session.missed_heartbeats, 3);
}

#[tokio::test]
async fn test_responsive_session_is_left_alone() {
    let h = Harness::new();
    let (user_id, outcome) = h.login_user().await;
    let session_id = outcome.session.session_id;

    let sweeper = sweeper(&h);

    for _ in 0..5 {
        h.heartbeats
            .record(session_id, user_id, &SessionMetadata::default())
            .await
            .unwrap();
        h.advance_secs(250);
        sweeper.sweep_once().await;
    }

    let session = h.sessions.get(session_id).await.unwrap().unwrap();
    assert!(session.is_active);
    assert_eq!(session.missed_heartbeats, 0);
}

#[tokio::test]
async fn test_session_without_heartbeats_is_not_charged() {
    let h = Harness::new();
    let (_, outcome) = h.login_user().await;

    let sweeper = sweeper(&h);
    h.advance_secs(700);
    sweeper.sweep_once().await;

    // No heartbeat was ever recorded, so the session is not penalized.
    let session = h
        .sessions
        .get(outcome.session.session_id)
        .await
        .unwrap()
        .unwrap();
    assert!(session.is_active);
    assert_eq!(session.missed_heartbeats, 0);
}

#[tokio::test]
async fn test_sweep_prunes_expired_sessions_from_the_roster() {
    let h = Harness::new();
    let (user_id, _) = h.login_user().await;
    assert!(h.sessions.roster().await.unwrap().contains(&user_id));

    h.advance_secs(24 * 3600 + 1);
    let sweeper = sweeper(&h);
    sweeper.sweep_once().await;

    assert!(h.sessions.list_by_user(user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sweep_survives_a_broken_store() {
    let h = Harness::broken();
    let sweeper = sweeper(&h);
    // Every store call fails; the sweep logs and returns.
    sweeper.sweep_once().await;
}
