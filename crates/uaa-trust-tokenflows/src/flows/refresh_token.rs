//! Refresh token flow.

use uaa_trust_core::OAuth2TokenResponse;

use super::FlowContext;
use crate::error::{Result, TokenFlowError};
use crate::params::{GrantParameter, GrantType};

/// Obtains a new access token from a refresh token.
#[derive(Clone)]
#[must_use]
pub struct RefreshTokenFlow {
    context: FlowContext,
    subdomain: Option<String>,
    refresh_token: Option<String>,
}

impl RefreshTokenFlow {
    pub(crate) const fn new(context: FlowContext) -> Self {
        Self {
            context,
            subdomain: None,
            refresh_token: None,
        }
    }

    /// Request the token for a tenant.
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// The refresh token to exchange. Required.
    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Exchange the refresh token for an access token.
    ///
    /// # Errors
    ///
    /// Returns `State` if no refresh token was set, or `Request` naming
    /// `refresh_token` if the grant fails.
    pub async fn execute(&self) -> Result<OAuth2TokenResponse> {
        let refresh_token = self
            .refresh_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| TokenFlowError::State("Refresh token not set".to_string()))?;

        let parameters = self
            .context
            .authenticated_parameters(GrantType::RefreshToken)
            .with(GrantParameter::RefreshToken, refresh_token);
        let request = self.context.request(parameters, self.subdomain.as_deref());
        self.context.send(&request).await
    }
}

impl std::fmt::Debug for RefreshTokenFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenFlow")
            .field("context", &self.context)
            .field("subdomain", &self.subdomain)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
