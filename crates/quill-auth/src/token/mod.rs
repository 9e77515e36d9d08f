//! Signed token creation, verification, and claims.

pub mod claims;
pub mod service;

pub use claims::{Claims, TokenType};
pub use service::{TokenPair, TokenService};
