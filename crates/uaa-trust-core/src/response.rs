//! OAuth2 token response.

use std::fmt;

use chrono::{DateTime, Utc};

/// The result of a successful grant exchange.
///
/// Constructed once per response and never mutated. Equality compares what
/// the server sent; `expires_at` depends on when the response was received.
#[derive(Clone)]
pub struct OAuth2TokenResponse {
    access_token: String,
    expires_in: u64,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
}

impl OAuth2TokenResponse {
    /// Create a response; the absolute expiry is computed from now.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        expires_in: u64,
        refresh_token: Option<String>,
    ) -> Self {
        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            access_token: access_token.into(),
            expires_in,
            refresh_token,
            expires_at,
        }
    }

    /// The access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Lifetime in seconds as reported by the server.
    #[must_use]
    pub const fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// The refresh token, if one was issued.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// When the access token expires.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl PartialEq for OAuth2TokenResponse {
    fn eq(&self, other: &Self) -> bool {
        self.access_token == other.access_token
            && self.expires_in == other.expires_in
            && self.refresh_token == other.refresh_token
    }
}

impl Eq for OAuth2TokenResponse {}

impl fmt::Debug for OAuth2TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
