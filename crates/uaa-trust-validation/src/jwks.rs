//! Key set fetching and public key construction.
//!
//! This module defines the [`KeySetFetcher`] seam through which key sets are
//! retrieved, an HTTPS implementation backed by `reqwest`, and the
//! conversion of a published JSON Web Key into a verification key.

use std::time::Duration;

use async_trait::async_trait;
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use jsonwebtoken::DecodingKey;
use reqwest::Url;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use uaa_trust_core::{JsonWebKey, JsonWebKeySet, KeyType};

use crate::error::{KeySetFetchError, Result, SignatureError};

/// Retrieves the key set published at a location.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Fetch the key set at `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key set cannot be retrieved or parsed.
    async fn fetch(&self, location: &Url) -> std::result::Result<JsonWebKeySet, KeySetFetchError>;
}

/// Fetches key sets over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Create a fetcher with a 10 second request timeout.
    ///
    /// Redirects are not followed: the location was checked against the
    /// trusted domain, the redirect target was not.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { client }
    }

    /// Create a fetcher with a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpKeySetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self, location: &Url) -> std::result::Result<JsonWebKeySet, KeySetFetchError> {
        tracing::debug!(url = %location, "Fetching key set");

        let response = self
            .client
            .get(location.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| KeySetFetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %location, status = %status, "Key set endpoint returned error");
            return Err(KeySetFetchError::Status {
                status: status.as_u16(),
            });
        }

        let key_set: JsonWebKeySet = response
            .json()
            .await
            .map_err(|e| KeySetFetchError::InvalidResponse(e.to_string()))?;

        tracing::debug!(url = %location, count = key_set.len(), "Fetched key set");
        Ok(key_set)
    }
}

/// Smallest RSA modulus accepted for verification.
pub const MIN_RSA_MODULUS_BITS: usize = 2048;

/// Construct a verification key from a published key.
///
/// RSA keys are built from the `n`/`e` components when present, otherwise
/// from the `value` (PEM, or bare base64 DER). The material is parsed and
/// checked here, so a key that comes back can actually verify signatures.
///
/// # Errors
///
/// Returns `InvalidKeyMaterial` for empty, undecodable or weak material and
/// `UnsupportedKeyType` for key types other than RSA.
pub fn decoding_key(jwk: &JsonWebKey) -> Result<DecodingKey> {
    match jwk.key_type() {
        KeyType::Rsa => rsa_decoding_key(jwk),
        other => {
            tracing::warn!(kty = %other, kid = %jwk.key_id(), "Unsupported key type");
            Err(SignatureError::UnsupportedKeyType(other.to_string()))
        }
    }
}

fn rsa_decoding_key(jwk: &JsonWebKey) -> Result<DecodingKey> {
    let key = rsa_public_key(jwk)?;
    check_rsa_key(&key).inspect_err(|e| {
        tracing::warn!(kid = %jwk.key_id(), error = %e, "Rejected RSA public key");
    })?;

    Ok(DecodingKey::from_rsa_raw_components(
        &key.n().to_bytes_be(),
        &key.e().to_bytes_be(),
    ))
}

fn rsa_public_key(jwk: &JsonWebKey) -> Result<RsaPublicKey> {
    if let (Some(n), Some(e)) = (jwk.modulus(), jwk.exponent()) {
        if n.is_empty() || e.is_empty() {
            return Err(invalid_key("empty RSA modulus or exponent"));
        }
        let n = decode_component(n)?;
        let e = decode_component(e)?;
        return RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
            .map_err(|err| invalid_key(format!("invalid RSA components: {err}")));
    }

    let value = jwk
        .public_key()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| invalid_key("no RSA key material"))?;

    // PEM armor is optional; only the base64 body matters.
    let body: String = value
        .lines()
        .filter(|line| !line.trim_start().starts_with("-----"))
        .flat_map(str::split_whitespace)
        .collect();
    let der = STANDARD
        .decode(&body)
        .map_err(|e| invalid_key(format!("invalid base64: {e}")))?;

    if value.starts_with("-----BEGIN RSA PUBLIC KEY-----") {
        RsaPublicKey::from_pkcs1_der(&der)
            .map_err(|e| invalid_key(format!("invalid RSA public key: {e}")))
    } else {
        RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| invalid_key(format!("invalid RSA public key: {e}")))
    }
}

fn decode_component(value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| invalid_key(format!("invalid base64url: {e}")))
}

/// Reject keys the verifier would refuse at signature time.
fn check_rsa_key(key: &RsaPublicKey) -> Result<()> {
    let bits = key.n().bits();
    if bits < MIN_RSA_MODULUS_BITS {
        return Err(invalid_key(format!(
            "RSA modulus of {bits} bits is below {MIN_RSA_MODULUS_BITS}"
        )));
    }

    let odd = key.e().to_bytes_be().last().is_some_and(|byte| byte & 1 == 1);
    if !odd {
        return Err(invalid_key("RSA exponent must be odd"));
    }
    Ok(())
}

fn invalid_key(reason: impl Into<String>) -> SignatureError {
    SignatureError::InvalidKeyMaterial(reason.into())
}

/// A key set fetcher for testing that serves a fixed key set.
///
/// Every call is recorded so tests can assert whether, and where, a fetch
/// happened.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockKeySetFetcher {
    key_set: Option<JsonWebKeySet>,
    requests: parking_lot::Mutex<Vec<Url>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockKeySetFetcher {
    /// Serve `key_set` for every location.
    #[must_use]
    pub fn new(key_set: JsonWebKeySet) -> Self {
        Self {
            key_set: Some(key_set),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Fail every fetch with a transport error.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            key_set: None,
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Number of fetches performed.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Locations fetched, in order.
    #[must_use]
    pub fn requested_locations(&self) -> Vec<Url> {
        self.requests.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl KeySetFetcher for MockKeySetFetcher {
    async fn fetch(&self, location: &Url) -> std::result::Result<JsonWebKeySet, KeySetFetchError> {
        self.requests.lock().push(location.clone());
        self.key_set
            .clone()
            .ok_or_else(|| KeySetFetchError::Transport("connection refused".to_string()))
    }
}
