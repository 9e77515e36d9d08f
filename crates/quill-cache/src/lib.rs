//! # quill-cache
//!
//! Backing-store provider implementations for the Quill auth core:
//!
//! - **memory**: In-process store using [dashmap](https://crates.io/crates/dashmap)
//!   with per-key expiry, for single-instance deployments
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration. Session
//! and revocation state must live in Redis whenever more than one server
//! instance shares it; the in-memory store never synchronizes across
//! processes.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
