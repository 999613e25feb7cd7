//! User token flow.
//!
//! Exchanging a user token takes two grant requests. The `user_token` grant
//! answers with a refresh token (its access token is only an intermediate
//! artifact), and a `refresh_token` grant for the same tenant turns that
//! into the access token returned to the caller.

use std::collections::BTreeMap;

use uaa_trust_core::{DecodedToken, OAuth2TokenResponse};

use super::{FlowContext, RefreshTokenFlow};
use crate::error::{Result, TokenFlowError, TokenServiceError};
use crate::params::{GrantParameter, GrantType};

/// Scope a user token must carry to be exchangeable.
pub const REQUIRED_USER_SCOPE: &str = "uaa.user";

/// Exchanges a user's JWT for an access token issued to this client.
#[derive(Clone)]
#[must_use]
pub struct UserTokenFlow {
    context: FlowContext,
    refresh_flow: RefreshTokenFlow,
    subdomain: Option<String>,
    token: Option<String>,
    attributes: BTreeMap<String, String>,
}

impl UserTokenFlow {
    pub(crate) fn new(context: FlowContext) -> Self {
        Self {
            refresh_flow: RefreshTokenFlow::new(context.clone()),
            context,
            subdomain: None,
            token: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Request the token for a tenant. Applies to both grant requests.
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// The user's JWT (compact form). Required.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Additional attributes sent as `authorities`.
    pub fn attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Exchange the user token for an access token.
    ///
    /// # Errors
    ///
    /// Returns `State` if no token was set or it lacks the `uaa.user` scope
    /// (no request is sent), or `Request` naming `user_token` if either grant
    /// request fails.
    pub async fn execute(&self) -> Result<OAuth2TokenResponse> {
        let token = self
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| TokenFlowError::State("User token not set".to_string()))?;
        check_user_scope(token)?;

        let refresh_token = self.request_refresh_token(token).await?;
        self.redeem_refresh_token(&refresh_token).await
    }

    /// First stage: the `user_token` grant, yielding a refresh token.
    async fn request_refresh_token(&self, token: &str) -> Result<String> {
        let parameters = self
            .context
            .parameters(GrantType::UserToken)
            .with(GrantParameter::ResponseType, "token")
            .with_authorities(&self.attributes)?;
        let request = self
            .context
            .request(parameters, self.subdomain.as_deref())
            .with_bearer_token(token)?;

        let response = self.context.send(&request).await?;
        response
            .refresh_token()
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| TokenFlowError::Request {
                grant_type: GrantType::UserToken,
                source: TokenServiceError::InvalidResponse(
                    "user token grant returned no refresh token".to_string(),
                ),
            })
    }

    /// Second stage: redeem the refresh token for the same tenant.
    async fn redeem_refresh_token(&self, refresh_token: &str) -> Result<OAuth2TokenResponse> {
        let mut flow = self.refresh_flow.clone().refresh_token(refresh_token);
        if let Some(subdomain) = &self.subdomain {
            flow = flow.subdomain(subdomain.clone());
        }

        flow.execute().await.map_err(|err| match err {
            TokenFlowError::Request { source, .. } => TokenFlowError::Request {
                grant_type: GrantType::UserToken,
                source,
            },
            other => other,
        })
    }
}

impl std::fmt::Debug for UserTokenFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserTokenFlow")
            .field("context", &self.context)
            .field("subdomain", &self.subdomain)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

fn check_user_scope(token: &str) -> Result<()> {
    let claims = DecodedToken::from_compact(token)
        .and_then(|token| token.claims())
        .map_err(|e| TokenFlowError::State(format!("User token is not a valid JWT: {e}")))?;

    if claims.has_scope(REQUIRED_USER_SCOPE) {
        Ok(())
    } else {
        Err(TokenFlowError::State(format!(
            "JWT token does not include scope '{REQUIRED_USER_SCOPE}'"
        )))
    }
}
