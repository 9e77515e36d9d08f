//! Heartbeat ingestion, liveness classification and history.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use quill_cache::keys;
use quill_cache::provider::CacheManager;
use quill_core::config::heartbeat::HeartbeatConfig;
use quill_core::result::AppResult;
use quill_core::traits::cache::CacheProvider;
use quill_core::traits::clock::Clock;

use crate::session::SessionMetadata;

/// One received heartbeat, kept for the history window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub heartbeat_id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub client_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// Rolling per-session counters, updated on every heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatSummary {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub last_heartbeat: DateTime<Utc>,
    pub heartbeat_count: u64,
    pub missed_count: u32,
}

/// Liveness classification derived from the time since the last ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatStatus {
    /// No heartbeat has ever been recorded for the session.
    NoHeartbeat,
    /// Last ping arrived within one interval.
    Active,
    /// Last ping is between one and two intervals old.
    Warning,
    /// Last ping is more than two intervals old.
    Timeout,
}

/// Tracks client liveness per session.
///
/// History records and summaries share one retention window so a
/// session that went quiet stays observable as `Timeout` until its
/// whole history ages out together.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    cache: Arc<CacheManager>,
    clock: Arc<dyn Clock>,
    interval: chrono::Duration,
    max_missed: u32,
    retention: Duration,
}

impl HeartbeatMonitor {
    pub fn new(cache: Arc<CacheManager>, clock: Arc<dyn Clock>, config: &HeartbeatConfig) -> Self {
        Self {
            cache,
            clock,
            interval: chrono::Duration::seconds(config.interval_seconds as i64),
            max_missed: config.max_missed,
            retention: Duration::from_secs(config.history_retention_seconds),
        }
    }

    /// Expected seconds between heartbeats.
    pub fn interval_seconds(&self) -> i64 {
        self.interval.num_seconds()
    }

    /// Records one heartbeat: appends to history, bumps the summary and
    /// resets the missed counter.
    pub async fn record(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        metadata: &SessionMetadata,
    ) -> AppResult<Uuid> {
        let now = self.clock.now();
        let record = HeartbeatRecord {
            heartbeat_id: Uuid::new_v4(),
            session_id,
            user_id,
            received_at: now,
            client_ip: metadata.client_ip,
            user_agent: metadata.user_agent.clone(),
        };

        self.cache
            .set_json(
                &keys::heartbeat_record(session_id, record.heartbeat_id),
                &record,
                self.retention,
            )
            .await?;
        self.cache
            .set_add(
                &keys::heartbeat_index(session_id),
                &record.heartbeat_id.to_string(),
                self.retention,
            )
            .await?;
        self.cache
            .set_add(
                &keys::heartbeat_roster(),
                &session_id.to_string(),
                self.retention,
            )
            .await?;

        let summary = match self.summary(session_id).await? {
            Some(mut s) => {
                s.last_heartbeat = now;
                s.heartbeat_count += 1;
                s.missed_count = 0;
                s
            }
            None => HeartbeatSummary {
                session_id,
                user_id,
                last_heartbeat: now,
                heartbeat_count: 1,
                missed_count: 0,
            },
        };
        self.write_summary(&summary).await?;

        debug!(
            session_id = %session_id,
            heartbeat_count = summary.heartbeat_count,
            "Heartbeat recorded"
        );
        Ok(record.heartbeat_id)
    }

    /// Current summary for a session, if any heartbeat is on record.
    pub async fn summary(&self, session_id: Uuid) -> AppResult<Option<HeartbeatSummary>> {
        self.cache
            .get_json(&keys::heartbeat_summary(session_id))
            .await
    }

    /// Classifies a session's liveness from its last heartbeat.
    pub async fn status(&self, session_id: Uuid) -> AppResult<HeartbeatStatus> {
        let Some(summary) = self.summary(session_id).await? else {
            return Ok(HeartbeatStatus::NoHeartbeat);
        };
        let elapsed = self.clock.now() - summary.last_heartbeat;
        let status = if elapsed <= self.interval {
            HeartbeatStatus::Active
        } else if elapsed <= self.interval * 2 {
            HeartbeatStatus::Warning
        } else {
            HeartbeatStatus::Timeout
        };
        Ok(status)
    }

    /// Charges one missed interval against a session.
    ///
    /// Returns `true` once the consecutive-miss count reaches the
    /// configured threshold; a session with no heartbeat record is not
    /// charged and yields `false`.
    pub async fn mark_missed(&self, session_id: Uuid) -> AppResult<bool> {
        let Some(mut summary) = self.summary(session_id).await? else {
            return Ok(false);
        };
        summary.missed_count += 1;
        self.write_summary(&summary).await?;

        let exceeded = summary.missed_count >= self.max_missed;
        if exceeded {
            info!(
                session_id = %session_id,
                missed = summary.missed_count,
                "Session exceeded missed-heartbeat threshold"
            );
        }
        Ok(exceeded)
    }

    /// Recent heartbeat records for a session, newest first.
    ///
    /// Index entries whose record has aged out are pruned on the way.
    pub async fn history(&self, session_id: Uuid, limit: usize) -> AppResult<Vec<HeartbeatRecord>> {
        let index_key = keys::heartbeat_index(session_id);
        let ids = self.cache.set_members(&index_key).await?;

        let mut records = Vec::with_capacity(ids.len());
        for raw in ids {
            let Ok(heartbeat_id) = raw.parse::<Uuid>() else {
                self.cache.set_remove(&index_key, &raw).await?;
                continue;
            };
            match self
                .cache
                .get_json::<HeartbeatRecord>(&keys::heartbeat_record(session_id, heartbeat_id))
                .await?
            {
                Some(record) => records.push(record),
                None => {
                    self.cache.set_remove(&index_key, &raw).await?;
                }
            }
        }

        records.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        records.truncate(limit);
        Ok(records)
    }

    /// Sweeps aged-out heartbeat state across all tracked sessions.
    ///
    /// Returns the number of entries removed. Idempotent: a second pass
    /// with nothing newly expired removes zero.
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        let roster_key = keys::heartbeat_roster();
        let mut removed = 0u64;

        for raw in self.cache.set_members(&roster_key).await? {
            let Ok(session_id) = raw.parse::<Uuid>() else {
                if self.cache.set_remove(&roster_key, &raw).await? {
                    removed += 1;
                }
                continue;
            };

            let index_key = keys::heartbeat_index(session_id);
            for id in self.cache.set_members(&index_key).await? {
                let gone = match id.parse::<Uuid>() {
                    Ok(hb) => {
                        !self
                            .cache
                            .exists(&keys::heartbeat_record(session_id, hb))
                            .await?
                    }
                    Err(_) => true,
                };
                if gone && self.cache.set_remove(&index_key, &id).await? {
                    removed += 1;
                }
            }

            let has_summary = self
                .cache
                .exists(&keys::heartbeat_summary(session_id))
                .await?;
            let has_history = !self.cache.set_members(&index_key).await?.is_empty();
            if !has_summary && !has_history && self.cache.set_remove(&roster_key, &raw).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, "Pruned expired heartbeat state");
        }
        Ok(removed)
    }

    async fn write_summary(&self, summary: &HeartbeatSummary) -> AppResult<()> {
        self.cache
            .set_json(
                &keys::heartbeat_summary(summary.session_id),
                summary,
                self.retention,
            )
            .await
    }
}
