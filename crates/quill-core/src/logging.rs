//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Initialize tracing/logging for the process.
///
/// `RUST_LOG` takes precedence over the configured level. Safe to call
/// once at startup; a second call returns without replacing the
/// subscriber.
pub fn init(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed, keeping existing one");
    }
}
