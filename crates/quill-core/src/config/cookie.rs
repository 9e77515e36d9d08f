//! Session cookie configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Attributes of the session-identifying cookie.
///
/// Set on login/refresh, cleared on logout. The path is always `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Max-Age in seconds.
    #[serde(default = "default_max_age")]
    pub max_age_seconds: u64,
    /// Cookie domain. `None` scopes the cookie to the serving host.
    #[serde(default)]
    pub domain: Option<String>,
    /// Whether the cookie requires HTTPS.
    #[serde(default)]
    pub secure: bool,
    /// Whether the cookie is hidden from client-side scripts.
    #[serde(default = "default_true")]
    pub http_only: bool,
    /// SameSite policy.
    #[serde(default)]
    pub same_site: SameSite,
}

/// Cookie SameSite policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    /// Sent on top-level navigations from other sites.
    #[default]
    Lax,
    /// Never sent cross-site.
    Strict,
    /// Always sent; requires `secure`.
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lax => write!(f, "Lax"),
            Self::Strict => write!(f, "Strict"),
            Self::None => write!(f, "None"),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_age_seconds: default_max_age(),
            domain: None,
            secure: false,
            http_only: default_true(),
            same_site: SameSite::default(),
        }
    }
}

fn default_name() -> String {
    "blog_auth_session".to_string()
}

fn default_max_age() -> u64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}
