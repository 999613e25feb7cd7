//! Client credentials flow.

use std::collections::BTreeMap;

use uaa_trust_core::OAuth2TokenResponse;

use super::FlowContext;
use crate::error::Result;
use crate::params::GrantType;

/// Obtains a technical access token for the client itself.
#[derive(Debug, Clone)]
#[must_use]
pub struct ClientCredentialsTokenFlow {
    context: FlowContext,
    subdomain: Option<String>,
    attributes: BTreeMap<String, String>,
}

impl ClientCredentialsTokenFlow {
    pub(crate) const fn new(context: FlowContext) -> Self {
        Self {
            context,
            subdomain: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Request the token for a tenant.
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Additional attributes sent as `authorities`.
    pub fn attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Request the access token.
    ///
    /// # Errors
    ///
    /// Returns `Request` naming `client_credentials` if the grant fails.
    pub async fn execute(&self) -> Result<OAuth2TokenResponse> {
        let parameters = self
            .context
            .authenticated_parameters(GrantType::ClientCredentials)
            .with_authorities(&self.attributes)?;
        let request = self.context.request(parameters, self.subdomain.as_deref());
        self.context.send(&request).await
    }
}
