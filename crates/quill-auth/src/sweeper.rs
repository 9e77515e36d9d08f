//! Background sweeper — periodic cleanup of expired auth state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use quill_core::config::session::SessionConfig;

use crate::heartbeat::{HeartbeatMonitor, HeartbeatStatus};
use crate::revocation::RevocationRegistry;
use crate::session::SessionStore;

/// Periodic cleanup loop for sessions, heartbeats and revocations.
///
/// Each cycle charges missed heartbeats against timed-out sessions,
/// deactivates sessions past the miss threshold, and prunes state the
/// store has already evicted. Errors are logged and never stop the
/// loop; individual sweeps are independent so one failing batch does
/// not starve the others.
#[derive(Debug)]
pub struct CleanupSweeper {
    sessions: Arc<SessionStore>,
    heartbeats: Arc<HeartbeatMonitor>,
    revocation: Arc<RevocationRegistry>,
    sweep_interval: Duration,
}

impl CleanupSweeper {
    pub fn new(
        sessions: Arc<SessionStore>,
        heartbeats: Arc<HeartbeatMonitor>,
        revocation: Arc<RevocationRegistry>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            sessions,
            heartbeats,
            revocation,
            sweep_interval: Duration::from_secs(config.sweep_interval_seconds),
        }
    }

    /// Runs until the cancel signal flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            interval_seconds = self.sweep_interval.as_secs(),
            "Cleanup sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Cleanup sweeper received shutdown signal");
                        break;
                    }
                }
                _ = time::sleep(self.sweep_interval) => {
                    self.sweep_once().await;
                }
            }
        }

        info!("Cleanup sweeper shut down");
    }

    /// One full cleanup cycle. Public so operators can trigger it
    /// out of band.
    pub async fn sweep_once(&self) {
        if let Err(e) = self.sweep_sessions().await {
            warn!(error = %e, "Session sweep failed");
        }
        match self.heartbeats.cleanup_expired().await {
            Ok(removed) if removed > 0 => debug!(removed, "Heartbeat sweep done"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Heartbeat sweep failed"),
        }
        match self.revocation.cleanup_expired().await {
            Ok(removed) if removed > 0 => debug!(removed, "Revocation sweep done"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Revocation sweep failed"),
        }
    }

    /// Walks every known session, expiring the stale and deactivating
    /// the silent.
    async fn sweep_sessions(&self) -> quill_core::result::AppResult<()> {
        for user_id in self.sessions.roster().await? {
            // list_by_user drops sessions past their hard expiry as a
            // side effect of reading them.
            for session in self.sessions.list_by_user(user_id).await? {
                if !session.is_active {
                    continue;
                }
                if self.heartbeats.status(session.session_id).await? == HeartbeatStatus::Timeout {
                    let exceeded = self.heartbeats.mark_missed(session.session_id).await?;
                    self.sessions.apply_missed(session.session_id).await?;
                    if exceeded {
                        info!(
                            session_id = %session.session_id,
                            user_id = %user_id,
                            "Deactivating session after missed heartbeats"
                        );
                        self.sessions.deactivate(session.session_id).await?;
                    }
                }
            }
            self.sessions.prune_roster_entry(user_id).await?;
        }
        Ok(())
    }
}
