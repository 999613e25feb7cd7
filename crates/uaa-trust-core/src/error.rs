//! Common error types for uaa-trust.
//!
//! This module provides the errors raised while constructing core values.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while building core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The token exceeds the maximum accepted size.
    #[error("token too large: {size} bytes (max {max})")]
    TokenTooLarge {
        /// Size of the rejected token in bytes.
        size: usize,
        /// Maximum accepted size in bytes.
        max: usize,
    },

    /// The token is not a three-segment compact JWT, or a segment does not decode.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The key type is not part of the supported set.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Client credentials are incomplete.
    #[error("invalid client credentials: {0}")]
    InvalidCredentials(String),
}
