//! Token signature validation.
//!
//! The [`SignatureValidator`] resolves the public key a token was signed with
//! (cache first, then the issuer's key set) and verifies the signature over
//! the token's original `header.payload` bytes.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use reqwest::Url;
use uaa_trust_core::{DecodedToken, KeyIdentifier};

use crate::cache::PublicKeyCache;
use crate::config::ValidatorConfig;
use crate::error::{Result, SignatureError};
use crate::header::TokenHeader;
use crate::jwks::{decoding_key, KeySetFetcher};

/// Outcome of a validation: success, or the specific reason for failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ValidationOutcome(std::result::Result<(), SignatureError>);

impl ValidationOutcome {
    /// A successful outcome.
    pub const fn valid() -> Self {
        Self(Ok(()))
    }

    /// A failed outcome with its cause.
    pub const fn invalid(cause: SignatureError) -> Self {
        Self(Err(cause))
    }

    /// Whether the token passed validation.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0.is_ok()
    }

    /// The failure cause, if validation failed.
    #[must_use]
    pub fn failure(&self) -> Option<&SignatureError> {
        self.0.as_ref().err()
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure cause if validation failed.
    pub fn into_result(self) -> Result<()> {
        self.0
    }
}

impl From<Result<()>> for ValidationOutcome {
    fn from(result: Result<()>) -> Self {
        Self(result)
    }
}

/// Trait for token validators.
///
/// Further claim validators (expiry, issuer, audience) implement the same
/// trait and compose with the signature check.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate a token.
    async fn validate(&self, token: &DecodedToken) -> ValidationOutcome;
}

/// Verifies token signatures against the issuer's published keys.
///
/// Each validator owns its key cache unless one is shared explicitly via
/// [`SignatureValidator::with_cache`], so separate issuers never share keys.
pub struct SignatureValidator {
    config: ValidatorConfig,
    fetcher: Arc<dyn KeySetFetcher>,
    cache: Arc<PublicKeyCache>,
}

impl SignatureValidator {
    /// Create a validator with its own key cache.
    #[must_use]
    pub fn new(config: ValidatorConfig, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        let cache = Arc::new(PublicKeyCache::new(
            config.key_cache_ttl(),
            config.key_cache_size,
        ));
        Self::with_cache(config, fetcher, cache)
    }

    /// Create a validator that uses the given key cache.
    #[must_use]
    pub fn with_cache(
        config: ValidatorConfig,
        fetcher: Arc<dyn KeySetFetcher>,
        cache: Arc<PublicKeyCache>,
    ) -> Self {
        Self {
            config,
            fetcher,
            cache,
        }
    }

    /// Get a reference to the key cache.
    #[must_use]
    pub fn cache(&self) -> &PublicKeyCache {
        &self.cache
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub const fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a token's signature using the key set at `key_set_location`.
    ///
    /// The location must be an HTTPS URL on the trusted issuer domain.
    pub async fn validate_with_location(
        &self,
        token: &DecodedToken,
        key_set_location: &str,
    ) -> ValidationOutcome {
        outcome(self.verify(token, key_set_location).await)
    }

    /// Validate a token's signature, locating the key set from its `jku`
    /// header or, failing that, the configured UAA URL.
    pub async fn validate_token(&self, token: &DecodedToken) -> ValidationOutcome {
        let result = match TokenHeader::from_token(token) {
            Ok(header) => match self.key_set_location(&header) {
                Ok(location) => self.verify_with_header(token, &header, &location).await,
                Err(cause) => Err(cause),
            },
            Err(cause) => Err(cause),
        };
        outcome(result)
    }

    /// Verify a token's signature, returning the failure cause on error.
    ///
    /// # Errors
    ///
    /// Returns the specific reason the signature could not be trusted.
    pub async fn verify(&self, token: &DecodedToken, key_set_location: &str) -> Result<()> {
        let header = TokenHeader::from_token(token)?;
        self.verify_with_header(token, &header, key_set_location).await
    }

    async fn verify_with_header(
        &self,
        token: &DecodedToken,
        header: &TokenHeader,
        key_set_location: &str,
    ) -> Result<()> {
        let key_id = header.key_id()?;
        let key_type = header.key_type(self.config.algorithm)?;
        let id = KeyIdentifier::new(key_type, key_id);

        let location = self.trusted_location(key_set_location)?;

        let key = match self.cache.get(&id) {
            Some(key) => key,
            None => self.fetch_key(&id, &location).await?,
        };

        self.verify_signature(token, &key)
    }

    fn key_set_location(&self, header: &TokenHeader) -> Result<String> {
        header
            .jku
            .as_deref()
            .filter(|jku| !jku.is_empty())
            .map(str::to_string)
            .or_else(|| self.config.token_keys_url())
            .ok_or(SignatureError::MissingKeySetLocation)
    }

    /// Accept only HTTPS locations on the trusted domain or its subdomains.
    fn trusted_location(&self, location: &str) -> Result<Url> {
        let untrusted = || {
            tracing::warn!(
                location = %location,
                uaa_domain = %self.config.uaa_domain,
                "Rejected key set location outside trusted domain"
            );
            SignatureError::UntrustedKeySetLocation(location.to_string())
        };

        let url = Url::parse(location).map_err(|_| untrusted())?;
        if url.scheme() != "https" {
            return Err(untrusted());
        }

        let domain = self.config.uaa_domain.trim_start_matches('.');
        let host = url.host_str().ok_or_else(untrusted)?;
        let trusted = !domain.is_empty()
            && (host.eq_ignore_ascii_case(domain)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", domain.to_ascii_lowercase())));

        if trusted {
            Ok(url)
        } else {
            Err(untrusted())
        }
    }

    async fn fetch_key(&self, id: &KeyIdentifier, location: &Url) -> Result<DecodingKey> {
        tracing::debug!(key = %id, url = %location, "Public key not cached, fetching key set");

        let key_set = self.fetcher.fetch(location).await?;
        let jwk = key_set
            .key_by_type_and_id(id.key_type(), id.key_id())
            .ok_or_else(|| SignatureError::KeyNotFound(id.clone()))?;
        let key = decoding_key(jwk)?;

        self.cache.put(id.clone(), key.clone());
        tracing::debug!(key = %id, "Cached public key");
        Ok(key)
    }

    fn verify_signature(&self, token: &DecodedToken, key: &DecodingKey) -> Result<()> {
        let verified = jsonwebtoken::crypto::verify(
            token.signature(),
            token.signing_input().as_bytes(),
            key,
            self.config.algorithm,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::Base64(_) => {
                SignatureError::MalformedToken(format!("signature is not base64url: {e}"))
            }
            jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
            | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_) => {
                SignatureError::InvalidKeyMaterial(e.to_string())
            }
            _ => SignatureError::SignatureMismatch,
        })?;

        if verified {
            Ok(())
        } else {
            Err(SignatureError::SignatureMismatch)
        }
    }
}

fn outcome(result: Result<()>) -> ValidationOutcome {
    if let Err(cause) = &result {
        tracing::debug!(
            error = %cause,
            transient = cause.is_transient(),
            "Token signature validation failed"
        );
    }
    result.into()
}

#[async_trait]
impl TokenValidator for SignatureValidator {
    async fn validate(&self, token: &DecodedToken) -> ValidationOutcome {
        self.validate_token(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::MockKeySetFetcher;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use uaa_trust_core::{JsonWebKeySet, KeyType};

    const DOMAIN: &str = "authentication.eu10.hana.ondemand.com";

    fn validator() -> SignatureValidator {
        SignatureValidator::new(
            ValidatorConfig::new(DOMAIN),
            Arc::new(MockKeySetFetcher::new(JsonWebKeySet::default())),
        )
    }

    #[test]
    fn trusted_locations() {
        let validator = validator();
        for location in [
            "https://authentication.eu10.hana.ondemand.com/token_keys",
            "https://tenant.authentication.eu10.hana.ondemand.com/token_keys",
            "https://Tenant.Authentication.EU10.hana.ondemand.com/token_keys",
        ] {
            assert!(
                validator.trusted_location(location).is_ok(),
                "{location} should be trusted"
            );
        }
    }

    #[test]
    fn untrusted_locations() {
        let validator = validator();
        for location in [
            "http://tenant.authentication.eu10.hana.ondemand.com/token_keys",
            "https://evil.com/token_keys",
            "https://authentication.eu10.hana.ondemand.com.evil.com/token_keys",
            "https://evilauthentication.eu10.hana.ondemand.com/token_keys",
            "not a url",
            "",
        ] {
            assert_eq!(
                validator.trusted_location(location).err(),
                Some(SignatureError::UntrustedKeySetLocation(location.to_string())),
                "{location} should be rejected"
            );
        }
    }

    #[test]
    fn empty_domain_trusts_nothing() {
        let validator = SignatureValidator::new(
            ValidatorConfig::new(""),
            Arc::new(MockKeySetFetcher::new(JsonWebKeySet::default())),
        );
        assert!(validator
            .trusted_location("https://anything.example.com/token_keys")
            .is_err());
    }

    fn header(jku: Option<&str>) -> TokenHeader {
        TokenHeader {
            kid: Some("key-id-1".to_string()),
            kty: None,
            alg: Some("RS256".to_string()),
            jku: jku.map(str::to_string),
        }
    }

    #[test]
    fn key_set_location_prefers_jku() {
        let jku = "https://other.authentication.eu10.hana.ondemand.com/token_keys";
        let with_fallback = SignatureValidator::new(
            ValidatorConfig::new(DOMAIN)
                .with_uaa_url("https://tenant.authentication.eu10.hana.ondemand.com"),
            Arc::new(MockKeySetFetcher::new(JsonWebKeySet::default())),
        );

        assert_eq!(with_fallback.key_set_location(&header(Some(jku))).unwrap(), jku);
        for jku in [None, Some("")] {
            assert_eq!(
                with_fallback.key_set_location(&header(jku)).unwrap(),
                "https://tenant.authentication.eu10.hana.ondemand.com/token_keys"
            );
        }
        assert_eq!(
            validator().key_set_location(&header(None)),
            Err(SignatureError::MissingKeySetLocation)
        );
    }

    #[test]
    fn outcome_exposes_cause() {
        let outcome = ValidationOutcome::invalid(SignatureError::SignatureMismatch);
        assert!(!outcome.is_valid());
        assert_eq!(outcome.failure(), Some(&SignatureError::SignatureMismatch));
        assert_eq!(
            outcome.into_result(),
            Err(SignatureError::SignatureMismatch)
        );

        let outcome = ValidationOutcome::valid();
        assert!(outcome.is_valid());
        assert!(outcome.failure().is_none());
    }

    #[tokio::test]
    async fn missing_kid_fails_before_fetch() {
        let fetcher = Arc::new(MockKeySetFetcher::new(JsonWebKeySet::default()));
        let validator = SignatureValidator::new(ValidatorConfig::new(DOMAIN), fetcher.clone());
        let token = DecodedToken::new(URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#), "e30", "c2ln");

        let outcome = validator
            .validate_with_location(&token, "https://authentication.eu10.hana.ondemand.com/token_keys")
            .await;

        assert_eq!(outcome.failure(), Some(&SignatureError::MissingKeyId));
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn missing_location_reported() {
        let validator = validator();
        let token = DecodedToken::new(
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"key-id-1"}"#),
            "e30",
            "c2ln",
        );

        let outcome = validator.validate_token(&token).await;
        assert_eq!(
            outcome.failure(),
            Some(&SignatureError::MissingKeySetLocation)
        );
    }

    #[tokio::test]
    async fn unavailable_key_set_is_transient() {
        let fetcher = Arc::new(MockKeySetFetcher::unavailable());
        let validator = SignatureValidator::new(ValidatorConfig::new(DOMAIN), fetcher.clone());
        let token = DecodedToken::new(
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"key-id-1"}"#),
            "e30",
            "c2ln",
        );

        let outcome = validator
            .validate_with_location(&token, "https://authentication.eu10.hana.ondemand.com/token_keys")
            .await;

        assert!(matches!(
            outcome.failure(),
            Some(SignatureError::KeySetUnavailable(_))
        ));
        assert!(outcome.failure().is_some_and(SignatureError::is_transient));
        assert_eq!(fetcher.fetch_count(), 1);
        assert!(validator
            .cache()
            .get(&KeyIdentifier::new(KeyType::Rsa, "key-id-1"))
            .is_none());
    }
}
