//! Framework-neutral request/response surface.
//!
//! The coordinator never touches a concrete HTTP type; callers adapt
//! their framework's request and response to these two traits.

/// Fallback cookie consulted when no `Authorization` header is present.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Read access to the credential-bearing parts of an incoming request.
pub trait AuthRequest {
    /// Value of a request header, if present.
    fn header(&self, name: &str) -> Option<&str>;

    /// Value of a request cookie, if present.
    fn cookie(&self, name: &str) -> Option<&str>;
}

/// Write access to the response being prepared for the client.
pub trait AuthResponse {
    /// Appends a `Set-Cookie` header value to the response.
    fn add_set_cookie(&mut self, value: String);
}

/// Pulls the bearer token off a request.
///
/// The `Authorization: Bearer` header wins; the access-token cookie is
/// a fallback for clients that cannot set headers.
pub fn extract_token(request: &dyn AuthRequest) -> Option<String> {
    if let Some(value) = request.header("authorization")
        && let Some(token) = value.strip_prefix("Bearer ")
        && !token.is_empty()
    {
        return Some(token.to_string());
    }
    request
        .cookie(ACCESS_TOKEN_COOKIE)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
