//! Token service client.
//!
//! This module provides the [`OAuth2TokenService`] seam the flows send their
//! grant requests through, and the [`XsuaaTokenService`] implementation that
//! posts them as forms to the UAA token endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::Deserialize;
use uaa_trust_core::OAuth2TokenResponse;

use crate::endpoints::replace_subdomain;
use crate::error::{Result, TokenFlowError, TokenServiceError};
use crate::params::{GrantParameters, GrantType};

/// A single grant request: where to send it, with which headers and form.
#[derive(Debug, Clone)]
pub struct GrantRequest {
    endpoint: Url,
    subdomain: Option<String>,
    headers: HeaderMap,
    parameters: GrantParameters,
}

impl GrantRequest {
    /// Create a request accepting a JSON response.
    #[must_use]
    pub fn new(endpoint: Url, parameters: GrantParameters) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            endpoint,
            subdomain: None,
            headers,
            parameters,
        }
    }

    /// Route the request to a tenant. Empty values are ignored.
    #[must_use]
    pub fn with_subdomain(mut self, subdomain: Option<&str>) -> Self {
        self.subdomain = subdomain.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }

    /// Authenticate the request with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `State` if the token contains characters not allowed in a header.
    pub fn with_bearer_token(mut self, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            TokenFlowError::State("User token is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// The token endpoint before tenant routing.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The tenant subdomain, if any.
    #[must_use]
    pub fn subdomain(&self) -> Option<&str> {
        self.subdomain.as_deref()
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Form parameters.
    #[must_use]
    pub const fn parameters(&self) -> &GrantParameters {
        &self.parameters
    }

    /// The grant type being requested.
    #[must_use]
    pub const fn grant_type(&self) -> GrantType {
        self.parameters.grant_type()
    }

    /// The URL the request is sent to, with the subdomain applied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` if a subdomain is set but the endpoint host
    /// is not a domain name with a parent.
    pub fn target(&self) -> std::result::Result<Url, TokenServiceError> {
        match &self.subdomain {
            Some(subdomain) => replace_subdomain(&self.endpoint, subdomain).ok_or_else(|| {
                TokenServiceError::InvalidEndpoint(format!(
                    "cannot route {} to subdomain '{subdomain}'",
                    self.endpoint
                ))
            }),
            None => Ok(self.endpoint.clone()),
        }
    }
}

/// Trait for services that exchange grants for tokens.
#[async_trait]
pub trait OAuth2TokenService: Send + Sync {
    /// Send a grant request and return the issued tokens.
    ///
    /// # Errors
    ///
    /// Returns a client error for rejected requests, a server or transport
    /// error for failures worth retrying.
    async fn request_token(
        &self,
        request: &GrantRequest,
    ) -> std::result::Result<OAuth2TokenResponse, TokenServiceError>;
}

/// Raw response from the token endpoint.
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: String,
    expires_in: ExpiresIn,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// `expires_in` is a number, but some servers send it as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(u64),
    Text(String),
}

impl ExpiresIn {
    fn seconds(&self) -> std::result::Result<u64, TokenServiceError> {
        match self {
            Self::Seconds(seconds) => Ok(*seconds),
            Self::Text(text) => text.trim().parse().map_err(|_| {
                TokenServiceError::InvalidResponse(format!("invalid expires_in: {text}"))
            }),
        }
    }
}

/// Token service that posts grant requests to a UAA token endpoint.
#[derive(Debug, Clone)]
pub struct XsuaaTokenService {
    client: reqwest::Client,
}

impl XsuaaTokenService {
    /// Create a service with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        // A followed 307/308 would resend the client secret to the target.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TokenFlowError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a service with a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn handle_response(
        &self,
        grant_type: GrantType,
        response: reqwest::Response,
    ) -> std::result::Result<OAuth2TokenResponse, TokenServiceError> {
        let status = response.status();

        if status.is_success() {
            let raw: RawTokenResponse = response
                .json()
                .await
                .map_err(|e| TokenServiceError::InvalidResponse(e.to_string()))?;
            let expires_in = raw.expires_in.seconds()?;

            tracing::debug!(grant_type = %grant_type, expires_in, "Received access token");
            return Ok(OAuth2TokenResponse::new(
                raw.access_token,
                expires_in,
                raw.refresh_token,
            ));
        }

        let message = response.text().await.unwrap_or_default();

        if status.is_client_error() {
            tracing::warn!(
                grant_type = %grant_type,
                status = %status,
                "Token request rejected"
            );
            Err(TokenServiceError::Client {
                status: status.as_u16(),
                message,
            })
        } else if status.is_server_error() {
            tracing::error!(
                grant_type = %grant_type,
                status = %status,
                message = %message,
                "Server error while obtaining access token"
            );
            Err(TokenServiceError::Server {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(TokenServiceError::InvalidResponse(format!(
                "unexpected status {status}"
            )))
        }
    }
}

impl Default for XsuaaTokenService {
    fn default() -> Self {
        Self::new().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            Self::with_client(reqwest::Client::new())
        })
    }
}

#[async_trait]
impl OAuth2TokenService for XsuaaTokenService {
    async fn request_token(
        &self,
        request: &GrantRequest,
    ) -> std::result::Result<OAuth2TokenResponse, TokenServiceError> {
        let url = request.target()?;
        let grant_type = request.grant_type();
        tracing::debug!(grant_type = %grant_type, url = %url, "Requesting access token");

        let response = self
            .client
            .post(url)
            .headers(request.headers.clone())
            .form(&request.parameters.form())
            .send()
            .await
            .map_err(|e| TokenServiceError::Transport(e.to_string()))?;

        self.handle_response(grant_type, response).await
    }
}

/// In-memory token service for tests.
///
/// Records every request and answers from a queue of prepared results,
/// falling back to a fixed result once the queue is empty.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockTokenService {
    queued: parking_lot::Mutex<
        std::collections::VecDeque<std::result::Result<OAuth2TokenResponse, TokenServiceError>>,
    >,
    fallback: std::result::Result<OAuth2TokenResponse, TokenServiceError>,
    requests: parking_lot::Mutex<Vec<GrantRequest>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockTokenService {
    /// Create a service that always answers with `result`.
    #[must_use]
    pub fn returning(result: std::result::Result<OAuth2TokenResponse, TokenServiceError>) -> Self {
        Self {
            queued: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            fallback: result,
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Answer the next request with `result` before falling back.
    pub fn enqueue(&self, result: std::result::Result<OAuth2TokenResponse, TokenServiceError>) {
        self.queued.lock().push_back(result);
    }

    /// All requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GrantRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl OAuth2TokenService for MockTokenService {
    async fn request_token(
        &self,
        request: &GrantRequest,
    ) -> std::result::Result<OAuth2TokenResponse, TokenServiceError> {
        self.requests.lock().push(request.clone());
        let queued = self.queued.lock().pop_front();
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::params::GrantParameter;

    fn client_credentials_request(server: &MockServer) -> GrantRequest {
        let endpoint = Url::parse(&format!("{}/oauth/token", server.uri())).unwrap();
        let parameters = GrantParameters::new(GrantType::ClientCredentials)
            .with(GrantParameter::ClientId, "clientId")
            .with(GrantParameter::ClientSecret, "clientSecret");
        GrantRequest::new(endpoint, parameters)
    }

    #[tokio::test]
    async fn posts_form_and_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=clientId"))
            .and(body_string_contains("client_secret=clientSecret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "4bfad399ca10490da95c2b5eb4451d53",
                "token_type": "bearer",
                "expires_in": 441_231,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = XsuaaTokenService::new().unwrap();
        let response = service
            .request_token(&client_credentials_request(&server))
            .await
            .unwrap();

        assert_eq!(response.access_token(), "4bfad399ca10490da95c2b5eb4451d53");
        assert_eq!(response.expires_in(), 441_231);
        assert!(response.refresh_token().is_none());
    }

    #[tokio::test]
    async fn expires_in_as_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token",
                "expires_in": "4711",
                "refresh_token": "99e2cecfa54f4957a782f07168915b69-r",
            })))
            .mount(&server)
            .await;

        let response = XsuaaTokenService::default()
            .request_token(&client_credentials_request(&server))
            .await
            .unwrap();

        assert_eq!(response.expires_in(), 4711);
        assert_eq!(
            response.refresh_token(),
            Some("99e2cecfa54f4957a782f07168915b69-r")
        );
    }

    #[tokio::test]
    async fn bearer_token_sent_in_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token",
                "expires_in": 60,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = client_credentials_request(&server)
            .with_bearer_token("user-jwt")
            .unwrap();
        XsuaaTokenService::default()
            .request_token(&request)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn client_error_not_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let err = XsuaaTokenService::default()
            .request_token(&client_credentials_request(&server))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TokenServiceError::Client {
                status: 401,
                message: "Bad credentials".to_string()
            }
        );
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = XsuaaTokenService::default()
            .request_token(&client_credentials_request(&server))
            .await
            .unwrap_err();

        assert!(matches!(err, TokenServiceError::Server { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn unparsable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let err = XsuaaTokenService::default()
            .request_token(&client_credentials_request(&server))
            .await
            .unwrap_err();

        assert!(matches!(err, TokenServiceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn redirect_is_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(307)
                    .insert_header("location", format!("{}/collect", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collect"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = XsuaaTokenService::new()
            .unwrap()
            .request_token(&client_credentials_request(&server))
            .await;

        assert!(matches!(result, Err(TokenServiceError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let endpoint = Url::parse("http://127.0.0.1:1/oauth/token").unwrap();
        let request = GrantRequest::new(
            endpoint,
            GrantParameters::new(GrantType::ClientCredentials),
        );

        let err = XsuaaTokenService::default()
            .request_token(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, TokenServiceError::Transport(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn subdomain_on_ip_host_rejected() {
        let endpoint = Url::parse("http://127.0.0.1:8080/oauth/token").unwrap();
        let request = GrantRequest::new(
            endpoint,
            GrantParameters::new(GrantType::ClientCredentials),
        )
        .with_subdomain(Some("tenant"));

        let err = XsuaaTokenService::default()
            .request_token(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, TokenServiceError::InvalidEndpoint(_)));
    }

    #[test]
    fn target_applies_subdomain() {
        let endpoint =
            Url::parse("https://tenant.authentication.eu10.hana.ondemand.com/oauth/token").unwrap();
        let request = GrantRequest::new(
            endpoint.clone(),
            GrantParameters::new(GrantType::RefreshToken),
        );
        assert_eq!(request.target().unwrap(), endpoint);

        let routed = request.with_subdomain(Some("other"));
        assert_eq!(routed.subdomain(), Some("other"));
        assert_eq!(
            routed.target().unwrap().as_str(),
            "https://other.authentication.eu10.hana.ondemand.com/oauth/token"
        );

        let empty = routed.with_subdomain(Some(""));
        assert!(empty.subdomain().is_none());
    }

    #[test]
    fn debug_hides_bearer_token() {
        let endpoint = Url::parse("https://tenant.authentication.example.com/oauth/token").unwrap();
        let request = GrantRequest::new(endpoint, GrantParameters::new(GrantType::UserToken))
            .with_bearer_token("secret-user-jwt")
            .unwrap();
        assert!(!format!("{request:?}").contains("secret-user-jwt"));
    }
}
