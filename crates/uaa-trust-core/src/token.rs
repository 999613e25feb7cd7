//! Decoded tokens and claim extraction.
//!
//! A [`DecodedToken`] keeps the three base64url segments of a compact JWT
//! exactly as they were received, so the signature can be checked over the
//! original bytes. Nothing here verifies anything.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

use crate::error::{CoreError, Result};

/// Maximum accepted size of a compact token (16KB).
///
/// Checked before any splitting or decoding.
pub const MAX_TOKEN_SIZE_BYTES: usize = 16 * 1024;

/// A JWT split into its encoded header, payload and signature segments.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedToken {
    header: String,
    payload: String,
    signature: String,
}

impl DecodedToken {
    /// Create a token from already split segments.
    #[must_use]
    pub fn new(
        header: impl Into<String>,
        payload: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            header: header.into(),
            payload: payload.into(),
            signature: signature.into(),
        }
    }

    /// Split a compact serialization (`header.payload.signature`).
    ///
    /// # Errors
    ///
    /// Returns `TokenTooLarge` if the token exceeds [`MAX_TOKEN_SIZE_BYTES`],
    /// or `MalformedToken` if it does not have three non-empty leading segments.
    pub fn from_compact(token: &str) -> Result<Self> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            return Err(CoreError::TokenTooLarge {
                size: token.len(),
                max: MAX_TOKEN_SIZE_BYTES,
            });
        }

        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CoreError::MalformedToken(
                "expected three dot-separated segments".to_string(),
            ));
        };

        if header.is_empty() || payload.is_empty() {
            return Err(CoreError::MalformedToken(
                "header and payload must not be empty".to_string(),
            ));
        }

        Ok(Self::new(header, payload, signature))
    }

    /// The encoded header segment.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// The encoded payload segment.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The encoded signature segment.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The bytes the signature was computed over: `header.payload` as encoded.
    #[must_use]
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }

    /// Decode and parse the header as JSON.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the segment is not base64url JSON.
    pub fn header_json(&self) -> Result<serde_json::Value> {
        decode_segment(&self.header, "header")
    }

    /// Decode and parse the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the segment is not base64url JSON.
    pub fn payload_json(&self) -> Result<serde_json::Value> {
        decode_segment(&self.payload, "payload")
    }

    /// Extract the claims used by the token flows.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the payload cannot be decoded.
    pub fn claims(&self) -> Result<TokenClaims> {
        serde_json::from_value(self.payload_json()?)
            .map_err(|e| CoreError::MalformedToken(format!("invalid claims: {e}")))
    }
}

impl fmt::Debug for DecodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedToken")
            .field("header", &self.header)
            .field("payload", &"[REDACTED]")
            .field("signature", &"[REDACTED]")
            .finish()
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<serde_json::Value> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CoreError::MalformedToken(format!("{name} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CoreError::MalformedToken(format!("{name} is not JSON: {e}")))
}

/// Claims read from a token payload.
///
/// Only the claims the token flows need are extracted; everything else in
/// the payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    scope: Scope,
    /// Client the token was issued to.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Issuing zone (tenant).
    #[serde(default)]
    pub zid: Option<String>,
}

/// Scope claim that can be either a space-separated string or an array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
enum Scope {
    Single(String),
    Multiple(Vec<String>),
    #[default]
    None,
}

impl TokenClaims {
    /// Check whether the token carries the given scope (exact match).
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().contains(&scope)
    }

    /// All scopes carried by the token.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        match &self.scope {
            Scope::Single(s) => s.split_whitespace().collect(),
            Scope::Multiple(v) => v.iter().map(String::as_str).collect(),
            Scope::None => Vec::new(),
        }
    }
}
