//! Heartbeat liveness configuration.

use serde::{Deserialize, Serialize};

/// Client liveness heartbeat configuration.
///
/// A session is `active` while pings keep arriving within one interval,
/// `warning` up to two intervals, and `timeout` past that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Expected interval between client heartbeats, in seconds.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Consecutive missed heartbeats before a session is force-expired.
    #[serde(default = "default_max_missed")]
    pub max_missed: u32,
    /// Retention window for heartbeat history records, in seconds.
    #[serde(default = "default_history_retention")]
    pub history_retention_seconds: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            max_missed: default_max_missed(),
            history_retention_seconds: default_history_retention(),
        }
    }
}

fn default_interval() -> u64 {
    5 * 60
}

fn default_max_missed() -> u32 {
    3
}

fn default_history_retention() -> u64 {
    60 * 60
}
