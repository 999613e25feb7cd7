//! OAuth2 token flows against UAA.
//!
//! This crate obtains access tokens from a UAA token endpoint:
//!
//! - Client credentials: a technical token for the client itself
//! - Refresh token: a new access token from a refresh token
//! - User token: a user's JWT exchanged for a token issued to this client
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use uaa_trust_core::ClientCredentials;
//! use uaa_trust_tokenflows::{ServiceEndpoints, TokenFlows, XsuaaTokenService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let flows = TokenFlows::new(
//!     Arc::new(XsuaaTokenService::new()?),
//!     ServiceEndpoints::new_secure("https://tenant.authentication.eu10.hana.ondemand.com")?,
//!     ClientCredentials::new("sb-application", "secret")?,
//! );
//!
//! let token = flows
//!     .client_credentials_token_flow()
//!     .subdomain("other-tenant")
//!     .execute()
//!     .await?;
//!
//! println!("Expires at: {}", token.expires_at());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod endpoints;
pub mod error;
pub mod flows;
pub mod params;

use std::sync::Arc;

use uaa_trust_core::ClientCredentials;

pub use client::{GrantRequest, OAuth2TokenService, XsuaaTokenService};
pub use endpoints::{replace_subdomain, ServiceEndpoints};
pub use error::{Result, TokenFlowError, TokenServiceError};
pub use flows::{ClientCredentialsTokenFlow, RefreshTokenFlow, UserTokenFlow, REQUIRED_USER_SCOPE};
pub use params::{authorities_json, GrantParameter, GrantParameters, GrantType};

#[cfg(any(test, feature = "test-utils"))]
pub use client::MockTokenService;

use flows::FlowContext;

/// Creates token flows that share a token service, endpoints and credentials.
#[derive(Debug, Clone)]
pub struct TokenFlows {
    context: FlowContext,
}

impl TokenFlows {
    /// Create a flow factory.
    #[must_use]
    pub fn new(
        service: Arc<dyn OAuth2TokenService>,
        endpoints: ServiceEndpoints,
        credentials: ClientCredentials,
    ) -> Self {
        Self {
            context: FlowContext::new(service, endpoints, credentials),
        }
    }

    /// Create a factory using the HTTP token service for the UAA at `uaa_url`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the URL is not HTTPS, the credentials are
    /// empty, or the HTTP client cannot be created.
    pub fn for_uaa(uaa_url: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        let endpoints = ServiceEndpoints::new_secure(uaa_url)?;
        let credentials = ClientCredentials::new(client_id, client_secret)?;
        let service = XsuaaTokenService::new()?;
        Ok(Self::new(Arc::new(service), endpoints, credentials))
    }

    /// A new client credentials flow.
    pub fn client_credentials_token_flow(&self) -> ClientCredentialsTokenFlow {
        ClientCredentialsTokenFlow::new(self.context.clone())
    }

    /// A new refresh token flow.
    pub fn refresh_token_flow(&self) -> RefreshTokenFlow {
        RefreshTokenFlow::new(self.context.clone())
    }

    /// A new user token flow.
    pub fn user_token_flow(&self) -> UserTokenFlow {
        UserTokenFlow::new(self.context.clone())
    }
}
