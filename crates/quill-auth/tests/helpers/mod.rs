//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use quill_auth::coordinator::AuthCoordinator;
use quill_auth::heartbeat::HeartbeatMonitor;
use quill_auth::revocation::RevocationRegistry;
use quill_auth::session::SessionStore;
use quill_auth::token::TokenService;
use quill_auth::transport::{ACCESS_TOKEN_COOKIE, AuthRequest, AuthResponse};
use quill_cache::memory::MemoryCacheProvider;
use quill_cache::provider::CacheManager;
use quill_core::config::auth::AuthConfig;
use quill_core::config::cookie::CookieConfig;
use quill_core::config::heartbeat::HeartbeatConfig;
use quill_core::config::session::SessionConfig;
use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::traits::cache::CacheProvider;
use quill_core::traits::clock::{Clock, ManualClock};
use quill_core::traits::users::{UserAccount, UserDirectory};

/// In-memory user directory for tests.
#[derive(Debug, Default)]
pub struct FakeDirectory {
    users: Mutex<HashMap<Uuid, UserAccount>>,
}

impl FakeDirectory {
    pub fn add(&self, username: &str, is_active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            id,
            UserAccount {
                id,
                username: username.to_string(),
                is_active,
            },
        );
        id
    }

    pub fn set_active(&self, id: Uuid, is_active: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.is_active = is_active;
        }
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<UserAccount>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}

/// A cache provider where every operation fails, for fail-closed tests.
#[derive(Debug)]
pub struct BrokenCache;

#[async_trait]
impl CacheProvider for BrokenCache {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::cache("store unreachable"))
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Err(AppError::cache("store unreachable"))
    }
    async fn set_default(&self, _key: &str, _value: &str) -> AppResult<()> {
        Err(AppError::cache("store unreachable"))
    }
    async fn set_nx(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<bool> {
        Err(AppError::cache("store unreachable"))
    }
    async fn delete(&self, _key: &str) -> AppResult<bool> {
        Err(AppError::cache("store unreachable"))
    }
    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Err(AppError::cache("store unreachable"))
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> AppResult<bool> {
        Err(AppError::cache("store unreachable"))
    }
    async fn set_add(&self, _key: &str, _member: &str, _ttl: Duration) -> AppResult<()> {
        Err(AppError::cache("store unreachable"))
    }
    async fn set_remove(&self, _key: &str, _member: &str) -> AppResult<bool> {
        Err(AppError::cache("store unreachable"))
    }
    async fn set_contains(&self, _key: &str, _member: &str) -> AppResult<bool> {
        Err(AppError::cache("store unreachable"))
    }
    async fn set_members(&self, _key: &str) -> AppResult<Vec<String>> {
        Err(AppError::cache("store unreachable"))
    }
    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
    async fn flush_all(&self) -> AppResult<()> {
        Err(AppError::cache("store unreachable"))
    }
}

/// A delegating provider whose `delete` fails for selected keys.
#[derive(Debug)]
pub struct FlakyDeleteCache {
    inner: Arc<dyn CacheProvider>,
    fail_fragment: Mutex<Option<String>>,
}

impl FlakyDeleteCache {
    pub fn new(inner: Arc<dyn CacheProvider>) -> Self {
        Self {
            inner,
            fail_fragment: Mutex::new(None),
        }
    }

    /// From now on, deletes of keys containing `fragment` fail.
    pub fn fail_deletes_containing(&self, fragment: &str) {
        *self.fail_fragment.lock().unwrap() = Some(fragment.to_string());
    }
}

#[async_trait]
impl CacheProvider for FlakyDeleteCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }
    async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set_default(key, value).await
    }
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.set_nx(key, value, ttl).await
    }
    async fn delete(&self, key: &str) -> AppResult<bool> {
        let fragment = self.fail_fragment.lock().unwrap().clone();
        if let Some(fragment) = fragment
            && key.contains(&fragment)
        {
            return Err(AppError::cache("transient delete failure"));
        }
        self.inner.delete(key).await
    }
    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.expire(key, ttl).await
    }
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set_add(key, member, ttl).await
    }
    async fn set_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        self.inner.set_remove(key, member).await
    }
    async fn set_contains(&self, key: &str, member: &str) -> AppResult<bool> {
        self.inner.set_contains(key, member).await
    }
    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        self.inner.set_members(key).await
    }
    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
    async fn flush_all(&self) -> AppResult<()> {
        self.inner.flush_all().await
    }
}

/// Fake incoming request carrying headers and cookies.
#[derive(Debug, Default)]
pub struct FakeRequest {
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
}

impl FakeRequest {
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers
            .insert("authorization".to_string(), format!("Bearer {token}"));
        self
    }

    pub fn with_access_cookie(mut self, token: &str) -> Self {
        self.cookies
            .insert(ACCESS_TOKEN_COOKIE.to_string(), token.to_string());
        self
    }

    pub fn with_session_cookie(mut self, session_id: Uuid) -> Self {
        self.cookies
            .insert(session_cookie_name(), session_id.to_string());
        self
    }

    pub fn with_raw_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }
}

impl AuthRequest for FakeRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Fake outgoing response collecting `Set-Cookie` values.
#[derive(Debug, Default)]
pub struct FakeResponse {
    pub set_cookies: Vec<String>,
}

impl AuthResponse for FakeResponse {
    fn add_set_cookie(&mut self, value: String) {
        self.set_cookies.push(value);
    }
}

pub fn session_cookie_name() -> String {
    CookieConfig::default().name
}

/// Fully wired auth stack on an in-memory store and a manual clock.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub cache: Arc<CacheManager>,
    pub revocation: Arc<RevocationRegistry>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionStore>,
    pub heartbeats: Arc<HeartbeatMonitor>,
    pub users: Arc<FakeDirectory>,
    pub coordinator: AuthCoordinator,
    pub heartbeat_config: HeartbeatConfig,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let provider: Arc<dyn CacheProvider> = Arc::new(MemoryCacheProvider::new(
            300,
            clock.clone() as Arc<dyn Clock>,
        ));
        Self::with_cache_provider(clock, provider)
    }

    /// A harness whose `delete` can be made to fail for chosen keys.
    pub fn with_flaky_deletes() -> (Self, Arc<FlakyDeleteCache>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let inner: Arc<dyn CacheProvider> = Arc::new(MemoryCacheProvider::new(
            300,
            clock.clone() as Arc<dyn Clock>,
        ));
        let flaky = Arc::new(FlakyDeleteCache::new(inner));
        let harness = Self::with_cache_provider(clock, flaky.clone());
        (harness, flaky)
    }

    /// A harness whose backing store always errors.
    pub fn broken() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        Self::with_cache_provider(clock, Arc::new(BrokenCache))
    }

    fn with_cache_provider(clock: Arc<ManualClock>, provider: Arc<dyn CacheProvider>) -> Self {
        let cache = Arc::new(CacheManager::from_provider(provider));

        let auth_config = AuthConfig {
            signing_secret: "integration-test-secret".to_string(),
            ..AuthConfig::default()
        };
        let session_config = SessionConfig::default();
        let heartbeat_config = HeartbeatConfig::default();

        let revocation = Arc::new(RevocationRegistry::new(
            cache.clone(),
            clock.clone() as Arc<dyn Clock>,
            Duration::from_secs(auth_config.refresh_ttl_hours * 3600),
        ));
        let tokens = Arc::new(TokenService::new(
            &auth_config,
            revocation.clone(),
            clock.clone() as Arc<dyn Clock>,
        ));
        let sessions = Arc::new(SessionStore::new(
            cache.clone(),
            clock.clone() as Arc<dyn Clock>,
            &session_config,
        ));
        let heartbeats = Arc::new(HeartbeatMonitor::new(
            cache.clone(),
            clock.clone() as Arc<dyn Clock>,
            &heartbeat_config,
        ));
        let users = Arc::new(FakeDirectory::default());

        let coordinator = AuthCoordinator::new(
            tokens.clone(),
            revocation.clone(),
            sessions.clone(),
            heartbeats.clone(),
            users.clone(),
            CookieConfig::default(),
            clock.clone() as Arc<dyn Clock>,
        );

        Self {
            clock,
            cache,
            revocation,
            tokens,
            sessions,
            heartbeats,
            users,
            coordinator,
            heartbeat_config,
        }
    }

    /// Advances the manual clock by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(chrono::Duration::seconds(secs));
    }

    /// Creates an active user and logs them in, returning the token
    /// pair and session.
    pub async fn login_user(&self) -> (Uuid, quill_auth::coordinator::LoginOutcome) {
        let user_id = self.users.add("author", true);
        let mut response = FakeResponse::default();
        let outcome = self
            .coordinator
            .login(user_id, Default::default(), &mut response)
            .await
            .unwrap();
        (user_id, outcome)
    }

    /// A request carrying a bearer token and the matching session cookie.
    pub fn authed_request(&self, token: &str, session_id: Uuid) -> FakeRequest {
        FakeRequest::default()
            .with_bearer(token)
            .with_session_cookie(session_id)
    }
}
