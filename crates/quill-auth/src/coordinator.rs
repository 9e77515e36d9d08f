//! Triple verification and the login/refresh/logout/heartbeat flows.
//!
//! A request is authenticated only when three independent credentials
//! agree: a valid bearer token, a live server-side session, and a
//! session cookie naming that same session. Any single stolen
//! credential is useless without the other two.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use quill_core::config::cookie::CookieConfig;
use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::traits::clock::Clock;
use quill_core::traits::users::{UserAccount, UserDirectory};

use crate::cookie::{build_clear_cookie, build_session_cookie};
use crate::error::{AuthRejection, CredentialKind};
use crate::heartbeat::HeartbeatMonitor;
use crate::revocation::RevocationRegistry;
use crate::session::{Session, SessionMetadata, SessionStore};
use crate::token::{TokenPair, TokenService, TokenType};
use crate::transport::{ACCESS_TOKEN_COOKIE, AuthRequest, AuthResponse, extract_token};

/// The identity attached to a request once all checks pass.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The verified account.
    pub user: UserAccount,
    /// The session the request is bound to.
    pub session_id: Uuid,
}

/// Everything a successful login hands back to the transport layer.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The freshly created session.
    pub session: Session,
    /// Access and refresh tokens bound to that session.
    pub tokens: TokenPair,
}

/// Orchestrates the authentication components into request-level flows.
#[derive(Debug, Clone)]
pub struct AuthCoordinator {
    tokens: Arc<TokenService>,
    revocation: Arc<RevocationRegistry>,
    sessions: Arc<SessionStore>,
    heartbeats: Arc<HeartbeatMonitor>,
    users: Arc<dyn UserDirectory>,
    cookie: CookieConfig,
    clock: Arc<dyn Clock>,
}

impl AuthCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tokens: Arc<TokenService>,
        revocation: Arc<RevocationRegistry>,
        sessions: Arc<SessionStore>,
        heartbeats: Arc<HeartbeatMonitor>,
        users: Arc<dyn UserDirectory>,
        cookie: CookieConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            revocation,
            sessions,
            heartbeats,
            users,
            cookie,
            clock,
        }
    }

    /// Runs the full verification chain against an incoming request.
    ///
    /// Checks short-circuit in a fixed order: token presence, token
    /// validity (signature, type, expiry, revocation), cookie presence,
    /// token/cookie session agreement, session liveness and ownership,
    /// then account status. The first failure wins; later checks never
    /// run, so a response cannot leak whether a forged token names a
    /// real session.
    pub async fn authenticate(
        &self,
        request: &dyn AuthRequest,
    ) -> Result<AuthenticatedUser, AuthRejection> {
        // Both credentials are extracted up front; absence rejects
        // before any verification work happens.
        let token = extract_token(request)
            .ok_or(AuthRejection::MissingCredential(CredentialKind::Token))?;
        let cookie_value = request
            .cookie(&self.cookie.name)
            .ok_or(AuthRejection::MissingCredential(CredentialKind::SessionCookie))?;

        let claims = self.tokens.verify(&token, TokenType::Access).await?;

        let cookie_session: Uuid = cookie_value
            .parse()
            .map_err(|_| AuthRejection::SessionExpired)?;

        // A token minted for one session must not ride another
        // session's cookie.
        if let Some(token_session) = claims.session_id
            && token_session != cookie_session
        {
            warn!(
                user_id = %claims.sub,
                token_session = %token_session,
                cookie_session = %cookie_session,
                "Token and cookie disagree on session"
            );
            return Err(AuthRejection::SessionMismatch);
        }

        let session = self
            .sessions
            .validate(cookie_session, Some(claims.sub))
            .await?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthRejection::UserInactive)?;

        // Activity bookkeeping must not fail the request.
        if let Err(e) = self.sessions.touch(session.session_id).await {
            debug!(error = %e, session_id = %session.session_id, "Failed to touch session");
        }

        Ok(AuthenticatedUser {
            user,
            session_id: session.session_id,
        })
    }

    /// Establishes a session for an already-credentialed user.
    ///
    /// Password or OAuth verification happens upstream; this creates
    /// the session record, mints the token pair and sets the session
    /// cookie on the response.
    pub async fn login(
        &self,
        user_id: Uuid,
        metadata: SessionMetadata,
        response: &mut dyn AuthResponse,
    ) -> AppResult<LoginOutcome> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::authentication("Account is unknown or deactivated"))?;

        let session = self.sessions.create(user_id, metadata).await?;
        let tokens = self.tokens.issue_pair(user_id, session.session_id)?;

        response.add_set_cookie(build_session_cookie(&self.cookie, session.session_id));

        info!(
            user_id = %user_id,
            username = %user.username,
            session_id = %session.session_id,
            "User logged in"
        );
        Ok(LoginOutcome { session, tokens })
    }

    /// Tears down the caller's credentials.
    ///
    /// The presented token is revoked and the cookie's session deleted.
    /// Both are attempted even if one fails, cookies are cleared
    /// unconditionally, and the first store error is reported after the
    /// response has been scrubbed.
    pub async fn logout(
        &self,
        request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> AppResult<()> {
        let mut first_error: Option<AppError> = None;

        if let Some(token) = extract_token(request)
            && let Ok(claims) = self.tokens.inspect(&token)
            && let Err(e) = self
                .revocation
                .add(&token, claims.expires_at(), "logout")
                .await
        {
            warn!(error = %e, "Failed to revoke token at logout");
            first_error.get_or_insert(e);
        }

        if let Some(session_id) = request
            .cookie(&self.cookie.name)
            .and_then(|v| v.parse::<Uuid>().ok())
            && let Err(e) = self.sessions.delete(session_id).await
        {
            warn!(error = %e, session_id = %session_id, "Failed to delete session at logout");
            first_error.get_or_insert(e);
        }

        response.add_set_cookie(build_clear_cookie(&self.cookie));
        let mut access_cookie = self.cookie.clone();
        access_cookie.name = ACCESS_TOKEN_COOKIE.to_string();
        response.add_set_cookie(build_clear_cookie(&access_cookie));

        match first_error {
            None => {
                info!("User logged out");
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    /// Exchanges a refresh token for a fresh access token.
    ///
    /// The session stays the same; only the access token is reminted.
    /// The session cookie is re-set so its Max-Age starts over.
    pub async fn refresh(
        &self,
        request: &dyn AuthRequest,
        response: &mut dyn AuthResponse,
    ) -> Result<TokenPair, AuthRejection> {
        let token = extract_token(request)
            .ok_or(AuthRejection::MissingCredential(CredentialKind::Token))?;
        let claims = self.tokens.verify(&token, TokenType::Refresh).await?;

        let session_id = claims.session_id.ok_or(AuthRejection::SessionExpired)?;
        let session = self.sessions.validate(session_id, Some(claims.sub)).await?;

        let access_token = self
            .tokens
            .issue_access(claims.sub, Some(session.session_id))?;
        let now = self.clock.now();
        let access_ttl =
            chrono::Duration::from_std(self.tokens.access_ttl()).unwrap_or(chrono::TimeDelta::MAX);

        self.sessions.touch(session.session_id).await?;
        response.add_set_cookie(build_session_cookie(&self.cookie, session.session_id));

        debug!(user_id = %claims.sub, session_id = %session.session_id, "Access token refreshed");
        Ok(TokenPair {
            access_token,
            refresh_token: token,
            access_expires_at: now + access_ttl,
            refresh_expires_at: claims.expires_at(),
        })
    }

    /// Accepts a liveness ping for a session the caller owns.
    ///
    /// Validation is synchronous; the history write and session counter
    /// update are spawned so the caller is not held up by store
    /// round-trips.
    pub async fn heartbeat(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        metadata: SessionMetadata,
    ) -> Result<(), AuthRejection> {
        self.sessions.validate(session_id, Some(user_id)).await?;

        let heartbeats = Arc::clone(&self.heartbeats);
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            if let Err(e) = heartbeats.record(session_id, user_id, &metadata).await {
                warn!(error = %e, session_id = %session_id, "Failed to record heartbeat");
            }
            if let Err(e) = sessions.apply_heartbeat(session_id).await {
                warn!(error = %e, session_id = %session_id, "Failed to update session counters");
            }
        });
        Ok(())
    }

    /// Deletes every other session the user owns, keeping the current one.
    pub async fn invalidate_other_sessions(
        &self,
        user_id: Uuid,
        current_session: Uuid,
    ) -> AppResult<u64> {
        self.sessions
            .invalidate_all_for_user(user_id, Some(current_session))
            .await
    }

    /// The session store, for transport-layer queries.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The heartbeat monitor, for liveness queries.
    pub fn heartbeats(&self) -> &Arc<HeartbeatMonitor> {
        &self.heartbeats
    }

    /// The token service.
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }
}
