//! Core types for uaa-trust.
//!
//! This crate provides the value types shared by the signature validation and
//! token flow crates:
//!
//! - **Key material**: key types, key identifiers, JSON Web Keys and key sets
//! - **Tokens**: a JWT split into its encoded segments, plus claim extraction
//! - **Credentials**: OAuth2 client credentials with a redacted secret
//! - **Token responses**: the result of a successful grant exchange
//!
//! # Example
//!
//! ```
//! use uaa_trust_core::{DecodedToken, KeyType, JsonWebKeySet};
//!
//! let jwks: JsonWebKeySet = serde_json::from_str(
//!     r#"{"keys":[{"kty":"RSA","kid":"key-id-1","n":"sXch","e":"AQAB"}]}"#,
//! ).unwrap();
//! assert!(jwks.key_by_type_and_id(KeyType::Rsa, "key-id-1").is_some());
//!
//! let token = DecodedToken::from_compact("eyJhbGciOiJSUzI1NiJ9.e30.c2ln").unwrap();
//! assert_eq!(token.signing_input(), "eyJhbGciOiJSUzI1NiJ9.e30");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod credentials;
pub mod error;
pub mod keys;
pub mod response;
pub mod token;

pub use credentials::ClientCredentials;
pub use error::{CoreError, Result};
pub use keys::{JsonWebKey, JsonWebKeySet, KeyIdentifier, KeyType};
pub use response::OAuth2TokenResponse;
pub use token::{DecodedToken, TokenClaims, MAX_TOKEN_SIZE_BYTES};
