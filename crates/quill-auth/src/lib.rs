//! # quill-auth
//!
//! The authentication and liveness core of the Quill blog backend.
//!
//! ## Modules
//!
//! - `token` — signed token creation and verification
//! - `revocation` — time-bounded denylist of revoked tokens
//! - `session` — server-side session records with per-user indexing
//! - `heartbeat` — client liveness tracking and classification
//! - `coordinator` — triple verification (token + session + cookie) and
//!   the login/refresh/logout flows
//! - `sweeper` — periodic background cleanup of expired state
//! - `transport` — request/response abstractions the HTTP layer adapts
//! - `cookie` — session cookie construction

pub mod cookie;
pub mod coordinator;
pub mod error;
pub mod heartbeat;
pub mod revocation;
pub mod session;
pub mod sweeper;
pub mod token;
pub mod transport;

pub use coordinator::{AuthCoordinator, AuthenticatedUser, LoginOutcome};
pub use error::AuthRejection;
pub use heartbeat::{HeartbeatMonitor, HeartbeatStatus};
pub use revocation::RevocationRegistry;
pub use session::{Session, SessionMetadata, SessionStore};
pub use sweeper::CleanupSweeper;
pub use token::{Claims, TokenPair, TokenService, TokenType};
