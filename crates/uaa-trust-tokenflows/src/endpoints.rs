//! UAA service endpoints.

use reqwest::Url;

use crate::error::{Result, TokenFlowError};

/// Endpoints of a UAA instance, derived from its base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    base_url: Url,
}

impl ServiceEndpoints {
    /// Create endpoints for the given base URL (e.g.
    /// `https://tenant.authentication.eu10.hana.ondemand.com`).
    ///
    /// Plain `http` is accepted here for local test servers; use
    /// [`ServiceEndpoints::new_secure`] in production.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the URL does not parse or has no host.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TokenFlowError::Configuration(format!("invalid UAA URL: {e}")))?;
        if base_url.host_str().is_none() || base_url.cannot_be_a_base() {
            return Err(TokenFlowError::Configuration(format!(
                "UAA URL has no host: {base_url}"
            )));
        }
        Ok(Self { base_url })
    }

    /// Create endpoints, requiring an HTTPS base URL.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the URL is invalid or not HTTPS.
    pub fn new_secure(base_url: &str) -> Result<Self> {
        let endpoints = Self::new(base_url)?;
        if endpoints.base_url.scheme() != "https" {
            return Err(TokenFlowError::Configuration(format!(
                "UAA URL must use https: {}",
                endpoints.base_url
            )));
        }
        Ok(endpoints)
    }

    /// The base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/oauth/token`
    #[must_use]
    pub fn token_endpoint(&self) -> Url {
        self.endpoint("oauth/token")
    }

    /// `{base}/oauth/authorize`
    #[must_use]
    pub fn authorize_endpoint(&self) -> Url {
        self.endpoint("oauth/authorize")
    }

    /// `{base}/token_keys`
    #[must_use]
    pub fn jwks_endpoint(&self) -> Url {
        self.endpoint("token_keys")
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let base_path = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{base_path}/{path}"));
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

/// Replace the first label of the URL's host with `subdomain`.
///
/// `https://tenant.authentication.example.com/oauth/token` with subdomain
/// `other` becomes `https://other.authentication.example.com/oauth/token`.
/// Returns `None` when the host is an IP address or a single label.
#[must_use]
pub fn replace_subdomain(url: &Url, subdomain: &str) -> Option<Url> {
    let (_, parent) = url.domain()?.split_once('.')?;
    let mut replaced = url.clone();
    replaced.set_host(Some(&format!("{subdomain}.{parent}"))).ok()?;
    Some(replaced)
}
