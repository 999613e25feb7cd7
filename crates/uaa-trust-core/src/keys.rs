//! JSON Web Key model.
//!
//! This module provides the key material types used to verify token
//! signatures: the closed set of key types, the `(type, id)` identifier a
//! token selects its key by, single keys and key sets as published by the
//! authorization server's token key endpoint.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::CoreError;

/// The family of a JSON Web Key (`kty`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// RSA public key.
    Rsa,
    /// Elliptic curve public key.
    Ec,
    /// Octet key pair (e.g. Ed25519).
    Okp,
}

impl KeyType {
    /// Return the `kty` value as published in a key set.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Ec => "EC",
            Self::Okp => "OKP",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSA" => Ok(Self::Rsa),
            "EC" => Ok(Self::Ec),
            "OKP" => Ok(Self::Okp),
            other => Err(CoreError::UnsupportedKeyType(other.to_string())),
        }
    }
}

/// Identifies a key within a key set by type and key id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyIdentifier {
    key_type: KeyType,
    key_id: String,
}

impl KeyIdentifier {
    /// Create a new key identifier.
    #[must_use]
    pub fn new(key_type: KeyType, key_id: impl Into<String>) -> Self {
        Self {
            key_type,
            key_id: key_id.into(),
        }
    }

    /// The key type.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// The key id (`kid`).
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_type, self.key_id)
    }
}

/// A single JSON Web Key.
///
/// RSA keys carry either the base64url modulus and exponent, or an
/// X.509 encoded public key in `value` (PEM or bare base64 DER).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonWebKey {
    id: KeyIdentifier,
    algorithm: Option<String>,
    key_use: Option<String>,
    modulus: Option<String>,
    exponent: Option<String>,
    public_key: Option<String>,
}

impl JsonWebKey {
    /// Create a key without any material attached.
    #[must_use]
    pub fn new(key_type: KeyType, key_id: impl Into<String>) -> Self {
        Self {
            id: KeyIdentifier::new(key_type, key_id),
            algorithm: None,
            key_use: None,
            modulus: None,
            exponent: None,
            public_key: None,
        }
    }

    /// Attach RSA modulus and exponent (base64url, no padding).
    #[must_use]
    pub fn with_components(mut self, modulus: impl Into<String>, exponent: impl Into<String>) -> Self {
        self.modulus = Some(modulus.into());
        self.exponent = Some(exponent.into());
        self
    }

    /// Attach an X.509 encoded public key.
    #[must_use]
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    /// Attach the declared algorithm (`alg`).
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// The `(type, id)` pair identifying this key.
    #[must_use]
    pub const fn identifier(&self) -> &KeyIdentifier {
        &self.id
    }

    /// The key type.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.id.key_type
    }

    /// The key id.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.id.key_id
    }

    /// The declared algorithm, if published.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    /// The declared key use (`use`), if published.
    #[must_use]
    pub fn key_use(&self) -> Option<&str> {
        self.key_use.as_deref()
    }

    /// The base64url RSA modulus (`n`).
    #[must_use]
    pub fn modulus(&self) -> Option<&str> {
        self.modulus.as_deref()
    }

    /// The base64url RSA exponent (`e`).
    #[must_use]
    pub fn exponent(&self) -> Option<&str> {
        self.exponent.as_deref()
    }

    /// The X.509 encoded public key (`value`).
    #[must_use]
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }
}

/// An ordered collection of JSON Web Keys.
///
/// Lookup returns the first key matching `(type, id)`. Duplicate pairs are a
/// configuration smell of the issuer and are logged when the set is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawKeySet")]
pub struct JsonWebKeySet {
    keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    /// Build a key set from keys in publication order.
    #[must_use]
    pub fn new(keys: Vec<JsonWebKey>) -> Self {
        let set = Self { keys };
        for id in set.duplicate_ids() {
            tracing::warn!(key = %id, "Key set contains duplicate key id, first entry wins");
        }
        set
    }

    /// Find the first key with the given type and id.
    #[must_use]
    pub fn key_by_type_and_id(&self, key_type: KeyType, key_id: &str) -> Option<&JsonWebKey> {
        self.keys
            .iter()
            .find(|k| k.key_type() == key_type && k.key_id() == key_id)
    }

    /// Identifiers that appear more than once, each reported once.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<KeyIdentifier> {
        let mut duplicates: Vec<KeyIdentifier> = Vec::new();
        for (i, key) in self.keys.iter().enumerate() {
            let seen_before = self.keys[..i].iter().any(|k| k.id == key.id);
            if seen_before && !duplicates.contains(&key.id) {
                duplicates.push(key.id.clone());
            }
        }
        duplicates
    }

    /// All keys in publication order.
    #[must_use]
    pub fn keys(&self) -> &[JsonWebKey] {
        &self.keys
    }

    /// Number of keys in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Key set document as served by the token key endpoint.
#[derive(Debug, Deserialize)]
struct RawKeySet {
    #[serde(default)]
    keys: Vec<RawKey>,
}

#[derive(Debug, Deserialize)]
struct RawKey {
    kty: String,
    kid: Option<String>,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
    value: Option<String>,
}

impl From<RawKeySet> for JsonWebKeySet {
    fn from(raw: RawKeySet) -> Self {
        let keys = raw
            .keys
            .into_iter()
            .filter_map(|key| {
                let key_type = match key.kty.parse::<KeyType>() {
                    Ok(key_type) => key_type,
                    Err(_) => {
                        tracing::warn!(kty = %key.kty, "Skipping key with unknown key type");
                        return None;
                    }
                };
                let Some(kid) = key.kid else {
                    tracing::debug!(kty = %key_type, "Skipping key without key id");
                    return None;
                };
                Some(JsonWebKey {
                    id: KeyIdentifier::new(key_type, kid),
                    algorithm: key.alg,
                    key_use: key.key_use,
                    modulus: key.n,
                    exponent: key.e,
                    public_key: key.value,
                })
            })
            .collect();
        Self::new(keys)
    }
}
