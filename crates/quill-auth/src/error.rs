//! Typed rejection reasons for authentication checks.

use thiserror::Error;

use quill_core::error::AppError;

/// Which credential was absent from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// The bearer token (header or fallback cookie).
    Token,
    /// The session-identifying cookie.
    SessionCookie,
}

/// Why an authentication attempt was rejected.
///
/// Every verification step classifies its failure into one of these
/// variants so that logs and tests can tell them apart. User-visible
/// responses must not: [`AuthRejection::public_message`] collapses all
/// variants into one generic string so callers cannot probe which step
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthRejection {
    /// No token or no session cookie was presented.
    #[error("missing credential")]
    MissingCredential(CredentialKind),
    /// The token signature did not verify, or the token was malformed.
    /// Malformed and forged tokens are deliberately indistinguishable.
    #[error("invalid token signature")]
    InvalidSignature,
    /// The token is of the wrong type for this operation.
    #[error("token type mismatch")]
    TypeMismatch,
    /// The token is past its expiry.
    #[error("token expired")]
    Expired,
    /// The token has been revoked before its natural expiry.
    #[error("token revoked")]
    Revoked,
    /// The referenced session no longer exists or is past its TTL.
    #[error("session expired")]
    SessionExpired,
    /// The session exists but has been deactivated.
    #[error("session inactive")]
    SessionInactive,
    /// The token's session id and the cookie's session id disagree.
    #[error("session mismatch between token and cookie")]
    SessionMismatch,
    /// The subject's account is unknown or deactivated.
    #[error("user inactive")]
    UserInactive,
    /// The shared backing store could not be consulted. Fail closed.
    #[error("backing store unavailable")]
    StoreUnavailable,
}

impl AuthRejection {
    /// The one string every rejection shows to the outside world.
    pub fn public_message(&self) -> &'static str {
        "Authentication failed, please sign in again"
    }
}

impl From<AppError> for AuthRejection {
    fn from(err: AppError) -> Self {
        tracing::warn!(error = %err, "Backing store error during authentication, failing closed");
        Self::StoreUnavailable
    }
}
