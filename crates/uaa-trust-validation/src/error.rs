//! Signature validation error types.

use thiserror::Error;
use uaa_trust_core::{CoreError, KeyIdentifier};

/// A result type using `SignatureError`.
pub type Result<T> = std::result::Result<T, SignatureError>;

/// Why a token signature could not be trusted.
///
/// Cryptographic mismatch (`SignatureMismatch`) is never conflated with the
/// causes that prevented the check from running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The token or its header could not be decoded.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token header has no `kid`.
    #[error("missing key id in token header")]
    MissingKeyId,

    /// The key type is unknown or cannot be used for verification.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Neither the token nor the configuration names a key set location.
    #[error("no key set location available")]
    MissingKeySetLocation,

    /// The key set location is not served by the trusted issuer domain.
    #[error("untrusted key set location: {0}")]
    UntrustedKeySetLocation(String),

    /// The key set could not be fetched.
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(#[from] KeySetFetchError),

    /// The key set has no key matching the token's type and id.
    #[error("key not found: {0}")]
    KeyNotFound(KeyIdentifier),

    /// The key material is empty or cannot be decoded into a public key.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The signature does not match the signed content.
    #[error("signature mismatch")]
    SignatureMismatch,
}

impl SignatureError {
    /// Returns `true` if retrying later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::KeySetUnavailable(cause) => cause.is_transient(),
            _ => false,
        }
    }

    /// Returns `true` if the signature was checked and did not match.
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        matches!(self, Self::SignatureMismatch)
    }
}

impl From<CoreError> for SignatureError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnsupportedKeyType(kty) => Self::UnsupportedKeyType(kty),
            other => Self::MalformedToken(other.to_string()),
        }
    }
}

/// Errors returned by a [`KeySetFetcher`](crate::KeySetFetcher).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySetFetchError {
    /// The request did not complete (connect, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(String),

    /// The key set endpoint answered with a non-success status.
    #[error("key set endpoint returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body is not a key set document.
    #[error("invalid key set response: {0}")]
    InvalidResponse(String),
}

impl KeySetFetchError {
    /// Returns `true` if a later fetch may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status } => *status >= 500 || *status == 429,
            Self::InvalidResponse(_) => false,
        }
    }
}
