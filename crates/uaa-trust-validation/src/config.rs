//! Signature validator configuration.

use std::time::Duration;

use jsonwebtoken::Algorithm;
use serde::Deserialize;

/// Configuration for a [`SignatureValidator`](crate::SignatureValidator).
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorConfig {
    /// Trusted issuer domain (e.g. `authentication.eu10.hana.ondemand.com`).
    ///
    /// Key sets are only fetched from HTTPS locations on this domain or one
    /// of its subdomains.
    pub uaa_domain: String,

    /// UAA base URL used to locate the key set when a token has no `jku`.
    #[serde(default)]
    pub uaa_url: Option<String>,

    /// How long a constructed public key stays trusted, in seconds.
    #[serde(default = "ValidatorConfig::default_cache_ttl")]
    pub key_cache_ttl_seconds: u64,

    /// Maximum number of cached public keys.
    #[serde(default = "ValidatorConfig::default_cache_size")]
    pub key_cache_size: usize,

    /// Signature algorithm. The token's own `alg` header is never consulted.
    #[serde(default = "ValidatorConfig::default_algorithm")]
    pub algorithm: Algorithm,
}

impl ValidatorConfig {
    /// Create a configuration for the given trusted domain with defaults.
    #[must_use]
    pub fn new(uaa_domain: impl Into<String>) -> Self {
        Self {
            uaa_domain: uaa_domain.into(),
            uaa_url: None,
            key_cache_ttl_seconds: Self::default_cache_ttl(),
            key_cache_size: Self::default_cache_size(),
            algorithm: Self::default_algorithm(),
        }
    }

    /// Set the UAA base URL.
    #[must_use]
    pub fn with_uaa_url(mut self, uaa_url: impl Into<String>) -> Self {
        self.uaa_url = Some(uaa_url.into());
        self
    }

    /// Set the key cache time-to-live.
    #[must_use]
    pub const fn with_key_cache_ttl(mut self, ttl: Duration) -> Self {
        self.key_cache_ttl_seconds = ttl.as_secs();
        self
    }

    /// Set the key cache size.
    #[must_use]
    pub const fn with_key_cache_size(mut self, size: usize) -> Self {
        self.key_cache_size = size;
        self
    }

    const fn default_cache_ttl() -> u64 {
        900 // 15 minutes
    }

    const fn default_cache_size() -> usize {
        100
    }

    const fn default_algorithm() -> Algorithm {
        Algorithm::RS256
    }

    /// Get the key cache time-to-live as a `Duration`.
    #[must_use]
    pub const fn key_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.key_cache_ttl_seconds)
    }

    /// Get the fallback key set URL (`{uaa_url}/token_keys`).
    #[must_use]
    pub fn token_keys_url(&self) -> Option<String> {
        self.uaa_url
            .as_ref()
            .map(|url| format!("{}/token_keys", url.trim_end_matches('/')))
    }
}

impl Default for ValidatorConfig {
    /// A configuration with no trusted domain; every key set location is rejected.
    fn default() -> Self {
        Self::new(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ValidatorConfig::new("authentication.eu10.hana.ondemand.com");
        assert_eq!(config.key_cache_ttl_seconds, 900);
        assert_eq!(config.key_cache_size, 100);
        assert_eq!(config.algorithm, Algorithm::RS256);
        assert_eq!(config.key_cache_ttl(), Duration::from_secs(900));
        assert!(config.token_keys_url().is_none());
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: ValidatorConfig = serde_json::from_str(
            r#"{"uaa_domain":"authentication.eu10.hana.ondemand.com",
                "uaa_url":"https://tenant.authentication.eu10.hana.ondemand.com/"}"#,
        )
        .unwrap();
        assert_eq!(config.key_cache_size, 100);
        assert_eq!(config.algorithm, Algorithm::RS256);
        assert_eq!(
            config.token_keys_url().as_deref(),
            Some("https://tenant.authentication.eu10.hana.ondemand.com/token_keys")
        );
    }

    #[test]
    fn builder_overrides() {
        let config = ValidatorConfig::new("example.com")
            .with_key_cache_ttl(Duration::from_secs(60))
            .with_key_cache_size(5);
        assert_eq!(config.key_cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.key_cache_size, 5);
    }

    #[test]
    fn default_trusts_no_domain() {
        let config = ValidatorConfig::default();
        assert!(config.uaa_domain.is_empty());
        assert_eq!(config.key_cache_size, 100);
    }
}
