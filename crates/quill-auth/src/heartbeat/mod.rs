//! Client liveness tracking via periodic heartbeats.

mod monitor;

pub use monitor::{HeartbeatMonitor, HeartbeatRecord, HeartbeatStatus, HeartbeatSummary};
