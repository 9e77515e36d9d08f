//! Session lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session TTL in seconds (absolute lifetime, regardless of activity).
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
    /// Interval for the background cleanup sweep in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_session_ttl() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval() -> u64 {
    5 * 60
}
