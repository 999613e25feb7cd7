//! Token header extraction.
//!
//! Reads the fields the validator needs (`kid`, `kty`, `alg`, `jku`) from the
//! decoded header of a token. Nothing read here is trusted until the
//! signature has been verified.

use jsonwebtoken::Algorithm;
use serde::Deserialize;
use uaa_trust_core::{DecodedToken, KeyType};

use crate::error::{Result, SignatureError};

/// The header fields used for key lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Key id.
    pub kid: Option<String>,
    /// Key type, rarely present in JWT headers.
    pub kty: Option<String>,
    /// Declared algorithm. Informational only.
    pub alg: Option<String>,
    /// Key set URL.
    pub jku: Option<String>,
}

impl TokenHeader {
    /// Extract the header of a token.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the header is not base64url JSON.
    pub fn from_token(token: &DecodedToken) -> Result<Self> {
        serde_json::from_value(token.header_json()?).map_err(|e| {
            tracing::debug!(error = %e, "Failed to parse token header");
            SignatureError::MalformedToken(format!("invalid header: {e}"))
        })
    }

    /// The key id, rejecting missing or empty values.
    ///
    /// # Errors
    ///
    /// Returns `MissingKeyId` if there is no usable `kid`.
    pub fn key_id(&self) -> Result<&str> {
        self.kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(SignatureError::MissingKeyId)
    }

    /// The key type to look up.
    ///
    /// Derived from the configured algorithm, never from the token's `alg`.
    /// A `kty` in the header must agree with it.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedKeyType` for unknown or mismatching `kty` values,
    /// or algorithms without a public key family.
    pub fn key_type(&self, configured: Algorithm) -> Result<KeyType> {
        let expected = key_type_for(configured)?;
        let Some(kty) = &self.kty else {
            return Ok(expected);
        };

        let declared = kty.parse::<KeyType>()?;
        if declared == expected {
            Ok(declared)
        } else {
            Err(SignatureError::UnsupportedKeyType(format!(
                "{declared} keys cannot verify {configured:?}"
            )))
        }
    }
}

/// The key family an algorithm verifies with.
///
/// # Errors
///
/// Returns `UnsupportedKeyType` for symmetric algorithms.
pub fn key_type_for(algorithm: Algorithm) -> Result<KeyType> {
    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Ok(KeyType::Rsa),
        Algorithm::ES256 | Algorithm::ES384 => Ok(KeyType::Ec),
        Algorithm::EdDSA => Ok(KeyType::Okp),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(
            SignatureError::UnsupportedKeyType(format!("{algorithm:?} has no public key")),
        ),
    }
}
