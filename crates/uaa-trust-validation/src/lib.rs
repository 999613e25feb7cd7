//! Token signature validation for UAA-issued JWTs.
//!
//! This crate verifies that a token was signed by the authorization server
//! it claims to come from:
//!
//! - Key set (JWKS) fetching from a trusted `token_keys` endpoint
//! - A bounded, time-limited cache of decoded public keys
//! - RSA signature verification over the token's original bytes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────────┐
//! │   Caller         │────▶│   TokenValidator   │
//! │   (service)      │     │   (trait)          │
//! └──────────────────┘     └─────────┬──────────┘
//!                                    │
//!                          ┌─────────▼──────────┐
//!                          │ SignatureValidator │
//!                          │ (impl)             │
//!                          └──┬──────────────┬──┘
//!                             │              │
//!                   ┌─────────▼──────┐ ┌─────▼──────────┐
//!                   │ PublicKeyCache │ │ KeySetFetcher  │
//!                   │ (ttl, bounded) │ │ (trait)        │
//!                   └────────────────┘ └─────┬──────────┘
//!                                            │ HTTPS
//!                                   ┌────────▼─────────┐
//!                                   │   UAA            │
//!                                   │   /token_keys    │
//!                                   └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use uaa_trust_core::DecodedToken;
//! use uaa_trust_validation::{HttpKeySetFetcher, SignatureValidator, ValidatorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ValidatorConfig::new("authentication.eu10.hana.ondemand.com");
//! let validator = SignatureValidator::new(config, Arc::new(HttpKeySetFetcher::new()));
//!
//! // In a request handler:
//! let token = DecodedToken::from_compact("eyJhbGciOiJSUzI1NiJ9.e30.c2ln")?;
//! let outcome = validator.validate_token(&token).await;
//!
//! if let Some(cause) = outcome.failure() {
//!     println!("Rejected: {cause}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod error;
pub mod header;
pub mod jwks;
pub mod signature;

pub use cache::PublicKeyCache;
pub use config::ValidatorConfig;
pub use error::{KeySetFetchError, Result, SignatureError};
pub use header::{key_type_for, TokenHeader};
pub use jwks::{decoding_key, HttpKeySetFetcher, KeySetFetcher};
pub use signature::{SignatureValidator, TokenValidator, ValidationOutcome};

#[cfg(any(test, feature = "test-utils"))]
pub use jwks::MockKeySetFetcher;
