//! Token issuance and verification with configurable signing and TTLs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use quill_core::config::AuthConfig;
use quill_core::error::AppError;
use quill_core::traits::clock::Clock;

use crate::error::AuthRejection;
use crate::revocation::RevocationRegistry;

use super::claims::{Claims, TokenType};

/// Issues and verifies signed, self-contained tokens.
#[derive(Clone)]
pub struct TokenService {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Signature-only validation; type and expiry are checked separately
    /// so the rejection ordering is exact.
    validation: Validation,
    /// Access token TTL.
    access_ttl: Duration,
    /// Refresh token TTL.
    refresh_ttl: Duration,
    /// Clock-skew leeway for expiry checks, in seconds.
    leeway_seconds: i64,
    /// Revocation denylist, consulted by raw token value.
    revocation: Arc<RevocationRegistry>,
    /// Time source.
    clock: Arc<dyn Clock>,
}

/// An access + refresh token pair bound to one session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Access token expiration timestamp.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration timestamp.
    pub refresh_expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenService {
    /// Creates a new token service from auth configuration.
    pub fn new(
        config: &AuthConfig,
        revocation: Arc<RevocationRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked manually after the type check.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(config.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_secret.as_bytes()),
            validation,
            access_ttl: Duration::from_secs(config.access_ttl_minutes * 60),
            refresh_ttl: Duration::from_secs(config.refresh_ttl_hours * 3600),
            leeway_seconds: config.expiry_leeway_seconds as i64,
            revocation,
            clock,
        }
    }

    /// Issues a signed token for the given subject.
    pub fn issue(
        &self,
        subject: Uuid,
        session_id: Option<Uuid>,
        ttl: Duration,
        token_type: TokenType,
    ) -> Result<String, AppError> {
        let now = self.clock.now();
        let exp = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX);

        let claims = Claims {
            sub: subject,
            session_id,
            token_type,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Issues an access token with the configured TTL.
    pub fn issue_access(&self, subject: Uuid, session_id: Option<Uuid>) -> Result<String, AppError> {
        self.issue(subject, session_id, self.access_ttl, TokenType::Access)
    }

    /// Issues a refresh token with the configured TTL.
    pub fn issue_refresh(
        &self,
        subject: Uuid,
        session_id: Option<Uuid>,
    ) -> Result<String, AppError> {
        self.issue(subject, session_id, self.refresh_ttl, TokenType::Refresh)
    }

    /// Issues an access + refresh pair bound to the given session.
    pub fn issue_pair(&self, subject: Uuid, session_id: Uuid) -> Result<TokenPair, AppError> {
        let now = self.clock.now();
        let access_ttl = chrono::Duration::from_std(self.access_ttl).unwrap_or(chrono::TimeDelta::MAX);
        let refresh_ttl =
            chrono::Duration::from_std(self.refresh_ttl).unwrap_or(chrono::TimeDelta::MAX);

        Ok(TokenPair {
            access_token: self.issue_access(subject, Some(session_id))?,
            refresh_token: self.issue_refresh(subject, Some(session_id))?,
            access_expires_at: now + access_ttl,
            refresh_expires_at: now + refresh_ttl,
        })
    }

    /// Verifies a token, in order: signature, type, expiry, revocation.
    ///
    /// Malformed input and bad signatures both map to `InvalidSignature`
    /// so callers cannot tell a forged token from a garbled one.
    pub async fn verify(
        &self,
        token: &str,
        expected_type: TokenType,
    ) -> Result<Claims, AuthRejection> {
        let claims = self.check_signature(token)?;

        if claims.token_type != expected_type {
            return Err(AuthRejection::TypeMismatch);
        }

        let now = self.clock.now();
        if now.timestamp() > claims.exp + self.leeway_seconds {
            return Err(AuthRejection::Expired);
        }

        // Revocation is keyed by the raw token value, not by claims.
        if self.revocation.is_revoked(token).await {
            return Err(AuthRejection::Revoked);
        }

        Ok(claims)
    }

    /// Decodes a token's claims after the signature check only.
    ///
    /// Used where an expired or revoked token must still be readable,
    /// such as revoking the token presented at logout.
    pub fn inspect(&self, token: &str) -> Result<Claims, AuthRejection> {
        self.check_signature(token)
    }

    /// Signature check and claims decode, with no expiry validation.
    fn check_signature(&self, token: &str) -> Result<Claims, AuthRejection> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token failed signature/format check");
                AuthRejection::InvalidSignature
            })
    }

    /// The configured access-token TTL.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// The configured refresh-token TTL.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}
