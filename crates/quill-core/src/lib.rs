//! # quill-core
//!
//! Core crate for the Quill blog backend's authentication core. Contains
//! configuration schemas, the collaborator traits (cache provider, clock,
//! user directory), logging setup, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Quill crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
