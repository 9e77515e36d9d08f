//! User directory collaborator interface.
//!
//! The auth core never owns user records; the surrounding application
//! (user service, database repository) implements this trait and hands
//! it in. Only the fields the coordinator needs are exposed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::AppResult;

/// The subset of a user record the auth core cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    /// User identifier (the token subject).
    pub id: Uuid,
    /// Display name, carried for logging only.
    pub username: String,
    /// Whether the account may authenticate.
    pub is_active: bool,
}

/// Lookup interface for user records.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Find a user by id. Returns `None` for unknown users.
    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<UserAccount>>;
}
