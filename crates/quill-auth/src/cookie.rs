//! `Set-Cookie` header construction for the session cookie.

use quill_core::config::cookie::CookieConfig;
use uuid::Uuid;

/// Builds the `Set-Cookie` value that binds a session to the browser.
pub fn build_session_cookie(config: &CookieConfig, session_id: Uuid) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite={}",
        config.name, session_id, config.max_age_seconds, config.same_site
    );
    if let Some(domain) = &config.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if config.secure {
        cookie.push_str("; Secure");
    }
    if config.http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}

/// Builds the `Set-Cookie` value that removes the session cookie.
pub fn build_clear_cookie(config: &CookieConfig) -> String {
    let mut cookie = format!(
        "{}=; Path=/; Max-Age=0; SameSite={}",
        config.name, config.same_site
    );
    if let Some(domain) = &config.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if config.secure {
        cookie.push_str("; Secure");
    }
    if config.http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}
