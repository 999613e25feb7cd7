//! OAuth2 client credentials.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{CoreError, Result};

/// Client id and secret used to authenticate against the token endpoint.
///
/// The secret is held as a [`SecretString`], so `Debug` output never shows it.
/// Equality compares both id and secret by value.
#[derive(Clone)]
pub struct ClientCredentials {
    id: String,
    secret: SecretString,
}

impl ClientCredentials {
    /// Create client credentials.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if the id or the secret is empty.
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let secret = secret.into();
        if id.is_empty() {
            return Err(CoreError::InvalidCredentials("client id is empty".to_string()));
        }
        if secret.is_empty() {
            return Err(CoreError::InvalidCredentials(
                "client secret is empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            secret: SecretString::from(secret),
        })
    }

    /// The client id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The client secret.
    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

impl PartialEq for ClientCredentials {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.secret.expose_secret() == other.secret.expose_secret()
    }
}

impl Eq for ClientCredentials {}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("id", &self.id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
