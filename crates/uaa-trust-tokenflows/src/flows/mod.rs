//! OAuth2 token flows.
//!
//! Each flow is configured with consuming setters and run with `execute`.
//! A configured flow can be executed any number of times; every call is an
//! independent grant request and nothing is cached here.

mod client_credentials;
mod refresh_token;
mod user_token;

use std::sync::Arc;

use secrecy::ExposeSecret;
use uaa_trust_core::{ClientCredentials, OAuth2TokenResponse};

pub use client_credentials::ClientCredentialsTokenFlow;
pub use refresh_token::RefreshTokenFlow;
pub use user_token::{UserTokenFlow, REQUIRED_USER_SCOPE};

use crate::client::{GrantRequest, OAuth2TokenService};
use crate::endpoints::ServiceEndpoints;
use crate::error::{Result, TokenFlowError};
use crate::params::{GrantParameter, GrantParameters, GrantType};

/// What every flow needs to reach the token endpoint.
#[derive(Clone)]
pub(crate) struct FlowContext {
    service: Arc<dyn OAuth2TokenService>,
    endpoints: ServiceEndpoints,
    credentials: ClientCredentials,
}

impl FlowContext {
    pub(crate) fn new(
        service: Arc<dyn OAuth2TokenService>,
        endpoints: ServiceEndpoints,
        credentials: ClientCredentials,
    ) -> Self {
        Self {
            service,
            endpoints,
            credentials,
        }
    }

    /// Parameters for `grant_type` carrying the client id.
    fn parameters(&self, grant_type: GrantType) -> GrantParameters {
        GrantParameters::new(grant_type).with(GrantParameter::ClientId, self.credentials.id())
    }

    /// Parameters for `grant_type` carrying client id and secret.
    fn authenticated_parameters(&self, grant_type: GrantType) -> GrantParameters {
        self.parameters(grant_type).with(
            GrantParameter::ClientSecret,
            self.credentials.secret().expose_secret(),
        )
    }

    fn request(&self, parameters: GrantParameters, subdomain: Option<&str>) -> GrantRequest {
        GrantRequest::new(self.endpoints.token_endpoint(), parameters).with_subdomain(subdomain)
    }

    /// Send the request, naming its grant type in any failure.
    async fn send(&self, request: &GrantRequest) -> Result<OAuth2TokenResponse> {
        let grant_type = request.grant_type();
        tracing::debug!(
            grant_type = %grant_type,
            client_id = %self.credentials.id(),
            subdomain = request.subdomain().unwrap_or_default(),
            "Executing token flow"
        );

        self.service
            .request_token(request)
            .await
            .map_err(|source| {
                tracing::debug!(grant_type = %grant_type, error = %source, "Token flow failed");
                TokenFlowError::Request { grant_type, source }
            })
    }
}

impl std::fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("endpoints", &self.endpoints)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
